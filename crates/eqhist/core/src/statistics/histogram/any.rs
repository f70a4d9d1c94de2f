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

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;

use super::equi_height::EquiHeight;
use super::error::{HistogramError, HistogramResult};
use super::predicate::Comparison;
use crate::statistics::value::{DataType, HistogramValue};

/// A histogram whose value type is only known at runtime, such as one read
/// back from a stored document
#[derive(Debug, Clone, PartialEq)]
pub enum AnyHistogram {
    Int(Arc<EquiHeight<i64>>),
    Uint(Arc<EquiHeight<u64>>),
    Double(Arc<EquiHeight<f64>>),
    String(Arc<EquiHeight<String>>),
    Bytes(Arc<EquiHeight<Vec<u8>>>),
    Date(Arc<EquiHeight<NaiveDate>>),
    Datetime(Arc<EquiHeight<NaiveDateTime>>),
}

macro_rules! dispatch {
    ($self:expr, $h:ident => $body:expr) => {
        match $self {
            AnyHistogram::Int($h) => $body,
            AnyHistogram::Uint($h) => $body,
            AnyHistogram::Double($h) => $body,
            AnyHistogram::String($h) => $body,
            AnyHistogram::Bytes($h) => $body,
            AnyHistogram::Date($h) => $body,
            AnyHistogram::Datetime($h) => $body,
        }
    };
}

fn compare_literal<T: HistogramValue>(histogram: &EquiHeight<T>, op: Comparison, literal: &str) -> HistogramResult<f64> {
    let value = T::parse_literal(literal)?;
    Ok(histogram.selectivity(&op.with(value)))
}

impl AnyHistogram {
    /// Decodes a document of any supported data type.
    pub fn from_document(doc: &Value, trusted: bool) -> HistogramResult<Self> {
        let data_type: DataType = doc
            .get("data-type")
            .and_then(Value::as_str)
            .ok_or_else(|| HistogramError::schema("missing data-type"))?
            .parse()?;

        Ok(match data_type {
            DataType::Int => AnyHistogram::Int(Arc::new(EquiHeight::from_document(doc, trusted)?)),
            DataType::Uint => AnyHistogram::Uint(Arc::new(EquiHeight::from_document(doc, trusted)?)),
            DataType::Double => AnyHistogram::Double(Arc::new(EquiHeight::from_document(doc, trusted)?)),
            DataType::String => AnyHistogram::String(Arc::new(EquiHeight::from_document(doc, trusted)?)),
            DataType::Bytes => AnyHistogram::Bytes(Arc::new(EquiHeight::from_document(doc, trusted)?)),
            DataType::Date => AnyHistogram::Date(Arc::new(EquiHeight::from_document(doc, trusted)?)),
            DataType::Datetime => AnyHistogram::Datetime(Arc::new(EquiHeight::from_document(doc, trusted)?)),
        })
    }

    pub fn to_document(&self) -> Value {
        dispatch!(self, h => h.to_document())
    }

    pub fn data_type(&self) -> DataType {
        dispatch!(self, h => h.data_type())
    }

    pub fn num_buckets(&self) -> usize {
        dispatch!(self, h => h.num_buckets())
    }

    pub fn num_buckets_specified(&self) -> usize {
        dispatch!(self, h => h.num_buckets_specified())
    }

    pub fn null_values_fraction(&self) -> f64 {
        dispatch!(self, h => h.null_values_fraction())
    }

    pub fn sampling_rate(&self) -> f64 {
        dispatch!(self, h => h.sampling_rate())
    }

    pub fn num_distinct_values(&self) -> u64 {
        dispatch!(self, h => h.num_distinct_values())
    }

    /// Estimates `column <op> literal`, parsing the literal as the
    /// histogram's value type.
    pub fn selectivity_str(&self, op: Comparison, literal: &str) -> HistogramResult<f64> {
        dispatch!(self, h => compare_literal(&**h, op, literal))
    }

    /// The typed histogram, if it holds values of type `T`.
    pub fn downcast<T: HistogramValue>(&self) -> Option<Arc<EquiHeight<T>>> {
        dispatch!(self, h => {
            let erased: Arc<dyn Any + Send + Sync> = h.clone();
            erased.downcast::<EquiHeight<T>>().ok()
        })
    }

    /// Rows of `(lower, upper, cumulative frequency, distinct values)` with
    /// the endpoints rendered as document values.
    pub fn bucket_rows(&self) -> Vec<(Value, Value, f64, u64)> {
        dispatch!(self, h => h
            .buckets()
            .iter()
            .map(|b| (b.lower_inclusive().to_json(), b.upper_inclusive().to_json(), b.cumulative_frequency(), b.num_distinct()))
            .collect())
    }
}

macro_rules! impl_from_histogram {
    ($variant:ident, $ty:ty) => {
        impl From<EquiHeight<$ty>> for AnyHistogram {
            fn from(histogram: EquiHeight<$ty>) -> Self {
                AnyHistogram::$variant(Arc::new(histogram))
            }
        }
    };
}

impl_from_histogram!(Int, i64);
impl_from_histogram!(Uint, u64);
impl_from_histogram!(Double, f64);
impl_from_histogram!(String, String);
impl_from_histogram!(Bytes, Vec<u8>);
impl_from_histogram!(Date, NaiveDate);
impl_from_histogram!(Datetime, NaiveDateTime);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::value_map::ValueMap;

    #[test]
    fn test_dispatch_on_data_type() {
        let map = ValueMap::from_sorted(vec![(1.5f64, 2), (2.5, 2)], 0, 1.0).unwrap();
        let h = EquiHeight::build(&map, 4).unwrap();
        let doc = h.to_document();

        let any = AnyHistogram::from_document(&doc, false).unwrap();
        assert_eq!(any.data_type(), DataType::Double);
        assert_eq!(any.num_buckets(), 2);
        assert_eq!(any, AnyHistogram::from(h));
        assert!((any.selectivity_str(Comparison::Eq, "2.5").unwrap() - 0.5).abs() < 1e-12);
        assert!(matches!(any.selectivity_str(Comparison::Eq, "two"), Err(HistogramError::InvalidInput(_))));
        assert!(any.downcast::<f64>().is_some());
        assert!(any.downcast::<i64>().is_none());
    }

    #[test]
    fn test_unknown_data_type() {
        let doc = serde_json::json!({"data-type": "geometry"});
        assert!(matches!(AnyHistogram::from_document(&doc, false), Err(HistogramError::SerializationSchema(_))));
        assert!(matches!(AnyHistogram::from_document(&serde_json::json!({}), false), Err(HistogramError::SerializationSchema(_))));
    }
}
