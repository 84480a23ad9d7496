use crate::ir::ChartType;

use super::*;

pub(super) fn compute_empty_layout(
    chart_type: ChartType,
    title: &str,
    theme: &Theme,
    config: &LayoutConfig,
    width: f32,
    height: f32,
) -> Layout {
    let message = Label {
        x: width / 2.0,
        y: height / 2.0,
        text: config.empty_message.clone(),
        font_size: theme.font_size * 1.2,
        anchor: TextAnchor::Middle,
        color: theme.muted_text_color.clone(),
        bold: false,
        rotate: None,
    };
    Layout {
        chart_type,
        width,
        height,
        title: title_label(title, theme, width, 60.0),
        hotspots: Vec::new(),
        diagram: DiagramData::Empty(EmptyLayout { message }),
    }
}
