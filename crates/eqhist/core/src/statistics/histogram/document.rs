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

//! Conversion between histograms and their JSON and binary documents.
//!
//! A JSON document looks like
//!
//! ```json
//! {
//!   "buckets": [[1, 10, 0.25, 10], [11, 11, 0.5, 1]],
//!   "data-type": "int",
//!   "null-values": 0.5,
//!   "collation-id": 8,
//!   "last-updated": "2025-01-01 00:00:00.000000",
//!   "sampling-rate": 1.0,
//!   "histogram-type": "equi-height",
//!   "number-of-buckets-specified": 16
//! }
//! ```
//!
//! Documents from outside the process are checked against every histogram
//! invariant. Trusted documents, and every binary payload, only get their
//! scalar fields and endpoint domains checked.

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use super::bucket::Bucket;
use super::equi_height::{EquiHeight, HISTOGRAM_TYPE, MAX_BUCKETS};
use super::error::{HistogramError, HistogramResult};
use crate::statistics::value::{DataType, HistogramValue};

const LAST_UPDATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const LAST_UPDATED_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Allowed distance between the total mass of a document and 1.
pub const MASS_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawDocument {
    buckets: Vec<Value>,
    data_type: DataType,
    null_values: f64,
    #[serde(default)]
    collation_id: Option<u32>,
    #[serde(default)]
    last_updated: Option<String>,
    sampling_rate: f64,
    histogram_type: String,
    #[serde(default)]
    number_of_buckets_specified: Option<usize>,
}

fn decode_bucket<T: HistogramValue>(index: usize, raw: &Value) -> HistogramResult<Bucket<T>> {
    let fields = raw
        .as_array()
        .filter(|fields| fields.len() == 4)
        .ok_or_else(|| HistogramError::schema(format!("bucket {index} is not a [lower, upper, cumulative frequency, distinct values] array")))?;

    let lower = T::from_json(&fields[0])?;
    let upper = T::from_json(&fields[1])?;
    let cumulative_frequency = fields[2]
        .as_f64()
        .ok_or_else(|| HistogramError::schema(format!("bucket {index} has a non-numeric cumulative frequency")))?;
    let num_distinct = match (fields[3].as_u64(), fields[3].as_i64()) {
        (Some(n), _) => n,
        (None, Some(_)) => return Err(HistogramError::invariant(format!("bucket {index} has fewer than one distinct value"))),
        (None, None) => return Err(HistogramError::schema(format!("bucket {index} has a non-integer distinct value count"))),
    };

    Ok(Bucket::new(lower, upper, cumulative_frequency, num_distinct))
}

fn is_fraction(x: f64) -> bool {
    (0.0..=1.0).contains(&x)
}

impl<T: HistogramValue> EquiHeight<T> {
    /// Converts the histogram to its JSON document.
    pub fn to_document(&self) -> Value {
        let buckets: Vec<Value> = self
            .buckets()
            .iter()
            .map(|b| json!([b.lower_inclusive().to_json(), b.upper_inclusive().to_json(), b.cumulative_frequency(), b.num_distinct()]))
            .collect();

        let mut doc = Map::new();
        doc.insert("buckets".to_string(), Value::Array(buckets));
        doc.insert("data-type".to_string(), json!(T::DATA_TYPE));
        doc.insert("null-values".to_string(), json!(self.null_values_fraction()));
        if let Some(collation_id) = self.collation_id() {
            doc.insert("collation-id".to_string(), json!(collation_id));
        }
        doc.insert("last-updated".to_string(), json!(self.last_updated().format(LAST_UPDATED_FORMAT).to_string()));
        doc.insert("sampling-rate".to_string(), json!(self.sampling_rate()));
        doc.insert("histogram-type".to_string(), json!(HISTOGRAM_TYPE));
        doc.insert("number-of-buckets-specified".to_string(), json!(self.num_buckets_specified()));
        Value::Object(doc)
    }

    pub fn to_json_string(&self) -> HistogramResult<String> {
        serde_json::to_string(&self.to_document()).map_err(|e| HistogramError::schema(e.to_string()))
    }

    /// Rebuilds a histogram from its JSON document.
    ///
    /// Untrusted documents are checked against every histogram invariant.
    pub fn from_document(doc: &Value, trusted: bool) -> HistogramResult<Self> {
        Self::decode_document(doc, trusted).inspect_err(|e| warn!(trusted, error = %e, "rejected histogram document"))
    }

    pub fn from_json_str(s: &str, trusted: bool) -> HistogramResult<Self> {
        let doc: Value = serde_json::from_str(s).map_err(|e| HistogramError::schema(e.to_string()))?;
        Self::from_document(&doc, trusted)
    }

    fn decode_document(doc: &Value, trusted: bool) -> HistogramResult<Self> {
        let raw = RawDocument::deserialize(doc).map_err(|e| HistogramError::schema(e.to_string()))?;

        if raw.histogram_type != HISTOGRAM_TYPE {
            return Err(HistogramError::schema(format!("unsupported histogram type '{}'", raw.histogram_type)));
        }
        if raw.data_type != T::DATA_TYPE {
            return Err(HistogramError::schema(format!("document holds {} values, expected {}", raw.data_type, T::DATA_TYPE)));
        }

        let last_updated = match raw.last_updated.as_deref() {
            Some(s) => NaiveDateTime::parse_from_str(s, LAST_UPDATED_PARSE_FORMAT)
                .map_err(|e| HistogramError::schema(format!("invalid last-updated timestamp '{s}': {e}")))?,
            None => NaiveDateTime::default(),
        };

        let mut buckets = Vec::new();
        buckets.try_reserve_exact(raw.buckets.len())?;
        for (index, bucket) in raw.buckets.iter().enumerate() {
            buckets.push(decode_bucket(index, bucket)?);
        }

        let num_buckets_specified = raw.number_of_buckets_specified.unwrap_or(buckets.len().max(1));
        let histogram = Self::from_parts(buckets, raw.null_values, raw.sampling_rate, num_buckets_specified, raw.collation_id, last_updated);
        histogram.validate(trusted)?;

        debug!(buckets = histogram.num_buckets(), trusted, data_type = %T::DATA_TYPE, "decoded histogram document");
        Ok(histogram)
    }

    /// Encodes the histogram in the compact binary form.
    pub fn to_bytes(&self) -> HistogramResult<Vec<u8>> {
        bincode::serde::encode_to_vec(self, bincode::config::standard()).map_err(|e| HistogramError::schema(e.to_string()))
    }

    /// Decodes a payload produced by [`EquiHeight::to_bytes`]. Binary payloads
    /// are treated as trusted.
    pub fn from_bytes(data: &[u8]) -> HistogramResult<Self> {
        let (histogram, _): (Self, usize) =
            bincode::serde::decode_from_slice(data, bincode::config::standard()).map_err(|e| HistogramError::schema(e.to_string()))?;
        histogram.validate(true)?;
        Ok(histogram)
    }

    /// Checks the invariants a histogram must satisfy. `trusted` limits the
    /// checks to the scalar fields and the bucket count.
    pub fn validate(&self, trusted: bool) -> HistogramResult<()> {
        let null_values = self.null_values_fraction();
        if !is_fraction(null_values) {
            return Err(HistogramError::invariant(format!("null fraction {null_values} is outside [0, 1]")));
        }
        let sampling_rate = self.sampling_rate();
        if !(sampling_rate > 0.0 && sampling_rate <= 1.0) {
            return Err(HistogramError::invariant(format!("sampling rate {sampling_rate} is outside (0, 1]")));
        }
        let specified = self.num_buckets_specified();
        if specified == 0 || specified > MAX_BUCKETS {
            return Err(HistogramError::invariant(format!("number of buckets specified {specified} is outside [1, {MAX_BUCKETS}]")));
        }
        if self.num_buckets() > specified {
            return Err(HistogramError::invariant(format!("{} buckets exceed the {specified} specified", self.num_buckets())));
        }
        for (index, bucket) in self.buckets().iter().enumerate() {
            for endpoint in [bucket.lower_inclusive(), bucket.upper_inclusive()] {
                endpoint.check_domain().map_err(|e| HistogramError::out_of_range(format!("bucket {index}: {e}")))?;
            }
        }

        if trusted {
            return Ok(());
        }

        let buckets = self.buckets();
        for (index, bucket) in buckets.iter().enumerate() {
            if bucket.upper_inclusive().value_lt(bucket.lower_inclusive()) {
                return Err(HistogramError::invariant(format!("bucket {index} has its upper bound below its lower bound")));
            }
            if !is_fraction(bucket.cumulative_frequency()) {
                return Err(HistogramError::invariant(format!("bucket {index} has cumulative frequency {} outside [0, 1]", bucket.cumulative_frequency())));
            }
            if bucket.num_distinct() < 1 {
                return Err(HistogramError::invariant(format!("bucket {index} has fewer than one distinct value")));
            }
            if bucket.is_singleton() && bucket.num_distinct() != 1 {
                return Err(HistogramError::invariant(format!("singleton bucket {index} claims {} distinct values", bucket.num_distinct())));
            }
        }

        for (index, pair) in buckets.windows(2).enumerate() {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.lower_inclusive().value_lt(prev.upper_inclusive()) {
                return Err(HistogramError::invariant(format!("bucket {} overlaps bucket {index}", index + 1)));
            }
            if next.cumulative_frequency() <= prev.cumulative_frequency() {
                return Err(HistogramError::invariant(format!("cumulative frequency does not increase at bucket {}", index + 1)));
            }
        }

        let non_null = buckets.last().map_or(0.0, Bucket::cumulative_frequency);
        let total = non_null + null_values;
        // A histogram without buckets saw only nulls, or nothing at all.
        let balanced = (total - 1.0).abs() <= MASS_TOLERANCE || (buckets.is_empty() && null_values == 0.0);
        if !balanced {
            return Err(HistogramError::invariant(format!("total mass {total} does not add up to 1")));
        }
        Ok(())
    }
}
