use std::fmt;

use thiserror::Error;

/// One offending field, addressed by a path such as `tasks[2].start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Every schema offense found in one payload, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(path, message);
        errors
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.0.iter().any(|err| err.path == path)
    }

    /// Turns the collection into `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, ChartError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(ChartError::SchemaValidation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, err) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("extraction service unavailable{}: {body}", status_suffix(.status))]
    UpstreamUnavailable { status: Option<u16>, body: String },
    #[error("could not recover JSON from the extraction response: {}", preview(.raw))]
    MalformedResponse { raw: String },
    #[error("unsupported chart type `{0}` (expected gantt, bar, pie, line or flow)")]
    UnsupportedChartType(String),
    #[error("chart data failed validation: {0}")]
    SchemaValidation(ValidationErrors),
}

/// Fieldless mirror of [`ChartError`], used where only the category matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UpstreamUnavailable,
    MalformedResponse,
    UnsupportedChartType,
    SchemaValidation,
}

impl ChartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChartError::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            ChartError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            ChartError::UnsupportedChartType(_) => ErrorKind::UnsupportedChartType,
            ChartError::SchemaValidation(_) => ErrorKind::SchemaValidation,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::UnsupportedChartType => "unsupported_chart_type",
            ErrorKind::SchemaValidation => "schema_validation",
        };
        f.write_str(name)
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

fn preview(raw: &str) -> String {
    const LIMIT: usize = 160;
    let trimmed = raw.trim();
    if trimmed.chars().count() <= LIMIT {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(LIMIT).collect();
    out.push('…');
    out
}
