use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::ChartError;
use crate::ir::ChartData;
use crate::schema;

/// A chart as submitted for saving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChart {
    pub title: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl NewChart {
    pub fn from_chart_data(data: &ChartData, user_id: Option<i64>) -> Self {
        Self {
            title: data.title().to_string(),
            chart_type: data.chart_type().to_string(),
            data: data.to_json(),
            user_id,
        }
    }
}

/// Persisted envelope. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub chart_type: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

struct StoreInner {
    next_id: u64,
    charts: BTreeMap<u64, Chart>,
}

impl Default for StoreInner {
    fn default() -> Self {
        Self {
            next_id: 1,
            charts: BTreeMap::new(),
        }
    }
}

/// In-memory chart storage; lives as long as the process.
#[derive(Default)]
pub struct ChartStore {
    inner: Mutex<StoreInner>,
}

impl ChartStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a raw save request and stores it.
    pub fn create(&self, payload: &Value) -> Result<Chart, ChartError> {
        let chart = schema::new_chart(payload)?;
        Ok(self.insert(chart))
    }

    pub fn insert(&self, chart: NewChart) -> Chart {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let stored = Chart {
            id,
            title: chart.title,
            chart_type: chart.chart_type,
            data: chart.data,
            created_at: Utc::now(),
            user_id: chart.user_id,
        };
        inner.charts.insert(id, stored.clone());
        info!(id, chart_type = %stored.chart_type, "chart saved");
        stored
    }

    pub fn get(&self, id: u64) -> Option<Chart> {
        self.lock().charts.get(&id).cloned()
    }

    /// All charts in id order.
    pub fn list_all(&self) -> Vec<Chart> {
        self.lock().charts.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
