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

use serde::{Deserialize, Serialize};

use crate::statistics::value::HistogramValue;

/// An equi-height bucket covering the closed interval `[lower, upper]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: HistogramValue")]
pub struct Bucket<T: HistogramValue> {
    lower: T,
    upper: T,
    cumulative_frequency: f64,
    num_distinct: u64,
}

impl<T: HistogramValue> Bucket<T> {
    pub fn new(lower: T, upper: T, cumulative_frequency: f64, num_distinct: u64) -> Self {
        Self {
            lower,
            upper,
            cumulative_frequency,
            num_distinct,
        }
    }

    pub fn lower_inclusive(&self) -> &T {
        &self.lower
    }

    pub fn upper_inclusive(&self) -> &T {
        &self.upper
    }

    /// Fraction of non-null observations in this bucket and every bucket before it.
    pub fn cumulative_frequency(&self) -> f64 {
        self.cumulative_frequency
    }

    pub fn num_distinct(&self) -> u64 {
        self.num_distinct
    }

    pub fn is_singleton(&self) -> bool {
        self.lower.value_eq(&self.upper)
    }

    pub fn contains(&self, value: &T) -> bool {
        !value.value_lt(&self.lower) && !self.upper.value_lt(value)
    }

    pub fn distance_from_lower(&self, value: &T) -> f64 {
        T::distance_below(&self.lower, &self.upper, value)
    }

    pub fn distance_from_upper(&self, value: &T) -> f64 {
        T::distance_above(&self.lower, &self.upper, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_contains() {
        let bucket = Bucket::new(10i64, 20, 0.5, 11);
        assert!(bucket.contains(&10));
        assert!(bucket.contains(&15));
        assert!(bucket.contains(&20));
        assert!(!bucket.contains(&9));
        assert!(!bucket.contains(&21));
        assert!(!bucket.is_singleton());
    }

    #[test]
    fn test_singleton_bucket() {
        let bucket = Bucket::new("x".to_string(), "x".to_string(), 1.0, 1);
        assert!(bucket.is_singleton());
        assert_eq!(bucket.num_distinct(), 1);
    }
}
