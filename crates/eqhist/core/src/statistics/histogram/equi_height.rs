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

use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::bucket::Bucket;
use super::builder::build_buckets;
use super::error::{HistogramError, HistogramResult};
use crate::statistics::value::{DataType, HistogramValue};
use crate::statistics::value_map::ValueMap;

/// Largest number of buckets a histogram may be asked for
pub const MAX_BUCKETS: usize = 1024;

pub const HISTOGRAM_TYPE: &str = "equi-height";

/// Equi-height histogram over a single column.
///
/// Immutable once built; every selectivity method only reads it, so a shared
/// reference can be queried from many threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: HistogramValue")]
pub struct EquiHeight<T: HistogramValue> {
    buckets: Vec<Bucket<T>>,
    null_values: f64,
    sampling_rate: f64,
    num_buckets_specified: usize,
    collation_id: Option<u32>,
    last_updated: NaiveDateTime,
}

pub(crate) fn check_bucket_request(num_buckets: usize) -> HistogramResult<()> {
    if num_buckets == 0 || num_buckets > MAX_BUCKETS {
        return Err(HistogramError::InvalidInput(format!("number of buckets must be between 1 and {MAX_BUCKETS}, got {num_buckets}")));
    }
    Ok(())
}

impl<T: HistogramValue> EquiHeight<T> {
    /// Builds a histogram of at most `num_buckets` buckets from `value_map`.
    pub fn build(value_map: &ValueMap<T>, num_buckets: usize) -> HistogramResult<Self> {
        Self::build_with_collation(value_map, num_buckets, None)
    }

    pub fn build_with_collation(value_map: &ValueMap<T>, num_buckets: usize, collation_id: Option<u32>) -> HistogramResult<Self> {
        check_bucket_request(num_buckets)?;

        let non_null = value_map.total_count();
        let total = non_null + value_map.null_count();
        let null_values = if total == 0 { 0.0 } else { value_map.null_count() as f64 / total as f64 };

        let buckets = build_buckets(value_map, num_buckets)?;

        Ok(Self {
            buckets,
            null_values,
            sampling_rate: value_map.sampling_rate(),
            num_buckets_specified: num_buckets,
            collation_id,
            last_updated: Utc::now().naive_utc().trunc_subsecs(6),
        })
    }

    /// Assembles a histogram from already validated parts.
    pub(crate) fn from_parts(
        buckets: Vec<Bucket<T>>,
        null_values: f64,
        sampling_rate: f64,
        num_buckets_specified: usize,
        collation_id: Option<u32>,
        last_updated: NaiveDateTime,
    ) -> Self {
        Self {
            buckets,
            null_values,
            sampling_rate,
            num_buckets_specified,
            collation_id,
            last_updated,
        }
    }

    pub fn buckets(&self) -> &[Bucket<T>] {
        &self.buckets
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn num_buckets_specified(&self) -> usize {
        self.num_buckets_specified
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn null_values_fraction(&self) -> f64 {
        self.null_values
    }

    /// Mass carried by the buckets. A histogram without buckets carries none,
    /// even when it saw no nulls either, so every selectivity on it is 0
    /// (`less_than` included).
    pub fn non_null_values_fraction(&self) -> f64 {
        if self.buckets.is_empty() { 0.0 } else { (1.0 - self.null_values).max(0.0) }
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    pub fn collation_id(&self) -> Option<u32> {
        self.collation_id
    }

    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    pub fn histogram_type(&self) -> &'static str {
        HISTOGRAM_TYPE
    }

    pub fn last_updated(&self) -> NaiveDateTime {
        self.last_updated
    }

    /// Estimated number of distinct non-null values.
    pub fn num_distinct_values(&self) -> u64 {
        self.buckets.iter().map(Bucket::num_distinct).sum()
    }

    fn bounded(&self, selectivity: f64) -> f64 {
        selectivity.max(0.0).min(self.non_null_values_fraction())
    }

    fn previous_cumulative(&self, index: usize) -> f64 {
        if index == 0 { 0.0 } else { self.buckets[index - 1].cumulative_frequency() }
    }

    fn bucket_frequency(&self, index: usize) -> f64 {
        self.buckets[index].cumulative_frequency() - self.previous_cumulative(index)
    }

    /// Index of the first bucket whose upper bound is at least `value`.
    fn first_upper_at_least(&self, value: &T) -> Option<usize> {
        let index = self.buckets.partition_point(|b| b.upper_inclusive().value_lt(value));
        (index < self.buckets.len()).then_some(index)
    }

    /// Index of the first bucket whose upper bound is greater than `value`.
    fn first_upper_greater(&self, value: &T) -> Option<usize> {
        let index = self.buckets.partition_point(|b| !value.value_lt(b.upper_inclusive()));
        (index < self.buckets.len()).then_some(index)
    }

    /// Estimated fraction of rows equal to `value`.
    pub fn equal_to(&self, value: &T) -> f64 {
        let Some(index) = self.first_upper_at_least(value) else {
            return 0.0;
        };
        let bucket = &self.buckets[index];
        if value.value_lt(bucket.lower_inclusive()) {
            return 0.0;
        }
        self.bounded(self.bucket_frequency(index) / bucket.num_distinct().max(1) as f64)
    }

    /// Estimated fraction of rows strictly less than `value`.
    pub fn less_than(&self, value: &T) -> f64 {
        if self.buckets.is_empty() {
            return 0.0;
        }
        let Some(index) = self.first_upper_at_least(value) else {
            return self.non_null_values_fraction();
        };
        let bucket = &self.buckets[index];
        let previous = self.previous_cumulative(index);
        if bucket.lower_inclusive().value_lt(value) {
            self.bounded(previous + self.bucket_frequency(index) * bucket.distance_from_lower(value))
        } else {
            self.bounded(previous)
        }
    }

    /// Estimated fraction of rows strictly greater than `value`.
    pub fn greater_than(&self, value: &T) -> f64 {
        let Some(index) = self.first_upper_greater(value) else {
            return 0.0;
        };
        let bucket = &self.buckets[index];
        let frequency = self.bucket_frequency(index);
        let tail = self.non_null_values_fraction() - bucket.cumulative_frequency();
        if value.value_lt(bucket.lower_inclusive()) {
            self.bounded(frequency + tail)
        } else {
            self.bounded(frequency * bucket.distance_from_upper(value) + tail)
        }
    }

    pub fn not_equal_to(&self, value: &T) -> f64 {
        self.bounded(self.non_null_values_fraction() - self.equal_to(value))
    }

    pub fn less_than_or_equal(&self, value: &T) -> f64 {
        self.bounded(self.less_than(value) + self.equal_to(value))
    }

    pub fn greater_than_or_equal(&self, value: &T) -> f64 {
        self.bounded(self.greater_than(value) + self.equal_to(value))
    }

    /// Estimated fraction of rows in the closed range `[lower, upper]`.
    pub fn between(&self, lower: &T, upper: &T) -> f64 {
        if upper.value_lt(lower) {
            return 0.0;
        }
        self.bounded(self.less_than_or_equal(upper) - self.less_than(lower))
    }

    pub fn not_between(&self, lower: &T, upper: &T) -> f64 {
        self.bounded(self.non_null_values_fraction() - self.between(lower, upper))
    }

    /// Estimated fraction of rows equal to any of `values`. Duplicates in the
    /// list are counted once.
    pub fn in_list(&self, values: &[T]) -> f64 {
        let mut sorted: Vec<&T> = values.iter().collect();
        sorted.sort_by(|a, b| a.compare(b));
        sorted.dedup_by(|a, b| a.value_eq(b));
        self.bounded(sorted.into_iter().map(|v| self.equal_to(v)).sum())
    }

    pub fn not_in_list(&self, values: &[T]) -> f64 {
        self.bounded(self.non_null_values_fraction() - self.in_list(values))
    }

    pub fn is_null(&self) -> f64 {
        self.null_values
    }

    pub fn is_not_null(&self) -> f64 {
        self.non_null_values_fraction()
    }
}
