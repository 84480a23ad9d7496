use crate::ir::{ChartData, ChartType};
use crate::layout::Layout;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Computed geometry next to the data it was computed from.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump<'a> {
    pub chart_type: ChartType,
    pub width: f32,
    pub height: f32,
    pub empty: bool,
    pub data: &'a ChartData,
    pub layout: &'a Layout,
}

impl<'a> LayoutDump<'a> {
    pub fn new(layout: &'a Layout, data: &'a ChartData) -> Self {
        Self {
            chart_type: layout.chart_type,
            width: layout.width,
            height: layout.height,
            empty: layout.is_empty_state(),
            data,
            layout,
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &Layout, data: &ChartData) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::new(layout, data);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{PieChartData, PieSlice};
    use crate::layout::compute_layout;
    use crate::theme::Theme;

    #[test]
    fn dump_tags_diagram_kind() {
        let data = ChartData::Pie(PieChartData {
            title: "Share".to_string(),
            data: vec![
                PieSlice {
                    label: "A".to_string(),
                    value: 1.0,
                    color: None,
                },
                PieSlice {
                    label: "B".to_string(),
                    value: 3.0,
                    color: None,
                },
            ],
        });
        let config = LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        };
        let layout = compute_layout(&data, &Theme::modern(), &config, (500.0, 300.0));
        let value = serde_json::to_value(LayoutDump::new(&layout, &data)).unwrap();
        assert_eq!(value["chartType"], "pie");
        assert_eq!(value["empty"], false);
        assert_eq!(value["layout"]["diagram"]["kind"], "pie");
        assert_eq!(value["data"]["data"][1]["value"], 3.0);
        assert_eq!(value["layout"]["hotspots"].as_array().unwrap().len(), 2);
    }
}
