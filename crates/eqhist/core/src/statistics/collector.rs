// Eqhist
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use chrono::{NaiveDateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::histogram::{AnyHistogram, Comparison, EquiHeight, HistogramError, MAX_BUCKETS};
use super::value::{DataType, HistogramValue};
use super::value_map::{ValueMap, check_sampling_rate};

#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("Table not found: {0}")]
    TableNotFound(String),
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Column {column} holds {actual} values, not {expected}")]
    TypeMismatch { column: String, expected: DataType, actual: DataType },
    #[error(transparent)]
    Histogram(#[from] HistogramError),
}

pub type StatisticsResult<T> = Result<T, StatisticsError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// Buckets requested when a caller does not ask for a specific number
    pub default_buckets: usize,
    pub max_buckets: usize,
    pub sampling_rate: f64,
    /// Skip ordering and mass checks for documents handed to the collector
    pub trust_stored_documents: bool,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            default_buckets: 100,
            max_buckets: MAX_BUCKETS,
            sampling_rate: 1.0,
            trust_stored_documents: false,
        }
    }
}

impl StatisticsConfig {
    pub fn validate(&self) -> StatisticsResult<()> {
        if self.max_buckets == 0 || self.max_buckets > MAX_BUCKETS {
            return Err(StatisticsError::InvalidConfiguration(format!("max_buckets must be between 1 and {MAX_BUCKETS}")));
        }
        if self.default_buckets == 0 || self.default_buckets > self.max_buckets {
            return Err(StatisticsError::InvalidConfiguration(format!(
                "default_buckets must be between 1 and max_buckets ({})",
                self.max_buckets
            )));
        }
        check_sampling_rate(self.sampling_rate).map_err(|e| StatisticsError::InvalidConfiguration(e.to_string()))
    }

    pub fn from_json_str(s: &str) -> StatisticsResult<Self> {
        let config: Self = serde_json::from_str(s).map_err(|e| StatisticsError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug)]
struct TableStatistics {
    histograms: HashMap<String, AnyHistogram>,
    last_updated: NaiveDateTime,
}

impl TableStatistics {
    fn new() -> Self {
        Self {
            histograms: HashMap::new(),
            last_updated: Utc::now().naive_utc(),
        }
    }
}

/// Column histograms of every registered table.
///
/// Histograms are built outside the lock and swapped in whole, so readers
/// only ever see a complete histogram, old or new.
#[derive(Debug)]
pub struct StatisticsCollector {
    config: StatisticsConfig,
    table_stats: RwLock<HashMap<String, TableStatistics>>,
}

impl StatisticsCollector {
    pub fn new(config: StatisticsConfig) -> StatisticsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            table_stats: RwLock::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    pub fn register_table(&self, table_name: &str) {
        self.table_stats.write().entry(table_name.to_string()).or_insert_with(TableStatistics::new);
    }

    /// Value map configured with the collector's sampling rate.
    pub fn value_map<T: HistogramValue>(&self) -> StatisticsResult<ValueMap<T>> {
        Ok(ValueMap::new(self.config.sampling_rate)?)
    }

    /// Builds a histogram for `table.column`, replacing any previous one.
    pub fn build_histogram<T>(&self, table: &str, column: &str, values: &ValueMap<T>, num_buckets: Option<usize>) -> StatisticsResult<AnyHistogram>
    where
        T: HistogramValue,
        EquiHeight<T>: Into<AnyHistogram>,
    {
        let num_buckets = num_buckets.unwrap_or(self.config.default_buckets);
        if num_buckets > self.config.max_buckets {
            return Err(HistogramError::InvalidInput(format!("{num_buckets} buckets exceed the configured maximum of {}", self.config.max_buckets)).into());
        }
        if !self.table_stats.read().contains_key(table) {
            return Err(StatisticsError::TableNotFound(table.to_string()));
        }

        let histogram: AnyHistogram = EquiHeight::build(values, num_buckets)?.into();
        self.install(table, column, histogram.clone())?;
        Ok(histogram)
    }

    /// Loads a histogram document for `table.column`.
    pub fn insert_document(&self, table: &str, column: &str, doc: &Value) -> StatisticsResult<AnyHistogram> {
        if !self.table_stats.read().contains_key(table) {
            return Err(StatisticsError::TableNotFound(table.to_string()));
        }
        let histogram = AnyHistogram::from_document(doc, self.config.trust_stored_documents)?;
        self.install(table, column, histogram.clone())?;
        Ok(histogram)
    }

    fn install(&self, table: &str, column: &str, histogram: AnyHistogram) -> StatisticsResult<()> {
        let mut stats = self.table_stats.write();
        let table_stats = stats.get_mut(table).ok_or_else(|| StatisticsError::TableNotFound(table.to_string()))?;

        let buckets = histogram.num_buckets();
        let replaced = table_stats.histograms.insert(column.to_string(), histogram).is_some();
        table_stats.last_updated = Utc::now().naive_utc();
        info!(table, column, buckets, replaced, "installed column histogram");
        Ok(())
    }

    pub fn get_histogram(&self, table: &str, column: &str) -> StatisticsResult<Option<AnyHistogram>> {
        let stats = self.table_stats.read();
        let table_stats = stats.get(table).ok_or_else(|| StatisticsError::TableNotFound(table.to_string()))?;

        Ok(table_stats.histograms.get(column).cloned())
    }

    fn require_histogram(&self, table: &str, column: &str) -> StatisticsResult<AnyHistogram> {
        self.get_histogram(table, column)?
            .ok_or_else(|| StatisticsError::ColumnNotFound(format!("{table}.{column}")))
    }

    /// The histogram of `table.column` as its typed form.
    pub fn get_typed<T: HistogramValue>(&self, table: &str, column: &str) -> StatisticsResult<Arc<EquiHeight<T>>> {
        let histogram = self.require_histogram(table, column)?;
        histogram.downcast::<T>().ok_or_else(|| StatisticsError::TypeMismatch {
            column: format!("{table}.{column}"),
            expected: T::DATA_TYPE,
            actual: histogram.data_type(),
        })
    }

    /// Estimates `table.column <op> literal`.
    pub fn estimate(&self, table: &str, column: &str, op: Comparison, literal: &str) -> StatisticsResult<f64> {
        Ok(self.require_histogram(table, column)?.selectivity_str(op, literal)?)
    }

    pub fn export(&self, table: &str, column: &str) -> StatisticsResult<Value> {
        Ok(self.require_histogram(table, column)?.to_document())
    }

    pub fn remove_histogram(&self, table: &str, column: &str) -> StatisticsResult<Option<AnyHistogram>> {
        let mut stats = self.table_stats.write();
        let table_stats = stats.get_mut(table).ok_or_else(|| StatisticsError::TableNotFound(table.to_string()))?;
        Ok(table_stats.histograms.remove(column))
    }

    /// Columns of `table` that have a histogram, sorted by name.
    pub fn columns(&self, table: &str) -> StatisticsResult<Vec<String>> {
        let stats = self.table_stats.read();
        let table_stats = stats.get(table).ok_or_else(|| StatisticsError::TableNotFound(table.to_string()))?;
        let mut columns: Vec<String> = table_stats.histograms.keys().cloned().collect();
        columns.sort();
        Ok(columns)
    }

    pub fn last_updated(&self, table: &str) -> StatisticsResult<NaiveDateTime> {
        let stats = self.table_stats.read();
        stats
            .get(table)
            .map(|t| t.last_updated)
            .ok_or_else(|| StatisticsError::TableNotFound(table.to_string()))
    }
}
