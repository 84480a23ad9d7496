//! Prompt in, validated chart out.

use tracing::{info, warn};

use crate::error::{ChartError, ErrorKind, ValidationErrors};
use crate::extract::ExtractionClient;
use crate::gantt_code::gantt_code;
use crate::ir::{ChartData, ChartType};
use crate::normalize::normalize_response;
use crate::schema::StrictChecks;
use crate::validate::validate_typed;

/// A successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedChart {
    pub data: ChartData,
    /// Mermaid source, for Gantt charts only.
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Requesting {
        chart_type: ChartType,
    },
    Success(GeneratedChart),
    Failed(ErrorKind),
}

pub struct ChartGenerator<C> {
    client: C,
    strict: StrictChecks,
    state: RequestState,
}

impl<C: ExtractionClient> ChartGenerator<C> {
    pub fn new(client: C) -> Self {
        Self::with_strict(client, StrictChecks::default())
    }

    pub fn with_strict(client: C, strict: StrictChecks) -> Self {
        Self {
            client,
            strict,
            state: RequestState::Idle,
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = RequestState::Idle;
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Runs one request to completion. Any previous result is discarded.
    pub fn generate(&mut self, prompt: &str, chart_type: &str) -> Result<GeneratedChart, ChartError> {
        self.reset();
        let result = self.run(prompt, chart_type);
        match &result {
            Ok(chart) => {
                info!(
                    chart_type = %chart.data.chart_type(),
                    items = chart.data.item_count(),
                    "chart generated"
                );
                self.state = RequestState::Success(chart.clone());
            }
            Err(err) => {
                warn!(kind = %err.kind(), error = %err, "chart generation failed");
                self.state = RequestState::Failed(err.kind());
            }
        }
        result
    }

    fn run(&mut self, prompt: &str, chart_type: &str) -> Result<GeneratedChart, ChartError> {
        let kind: ChartType = chart_type.parse()?;
        if prompt.trim().is_empty() {
            return Err(ChartError::SchemaValidation(ValidationErrors::single(
                "prompt", "required",
            )));
        }
        self.state = RequestState::Requesting { chart_type: kind };

        let payload = self.client.extract(prompt, kind)?;
        let normalized = normalize_response(&payload)?;
        let data = validate_typed(kind, &normalized.value, &self.strict)?;
        let code = match &data {
            ChartData::Gantt(chart) => Some(gantt_code(chart)),
            _ => None,
        };
        Ok(GeneratedChart { data, code })
    }
}
