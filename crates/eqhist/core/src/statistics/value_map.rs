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

use super::histogram::{HistogramError, HistogramResult};
use super::value::HistogramValue;

pub(crate) fn check_sampling_rate(sampling_rate: f64) -> HistogramResult<()> {
    if sampling_rate > 0.0 && sampling_rate <= 1.0 {
        Ok(())
    } else {
        Err(HistogramError::InvalidInput(format!("sampling rate {sampling_rate} is outside (0, 1]")))
    }
}

/// Ordered (value, count) pairs observed in a sample, plus the number of
/// null observations.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueMap<T: HistogramValue> {
    entries: Vec<(T, u64)>,
    null_count: u64,
    /// Non-null plus null observations; never exceeds `u64::MAX`.
    observations: u64,
    sampling_rate: f64,
}

impl<T: HistogramValue> ValueMap<T> {
    pub fn new(sampling_rate: f64) -> HistogramResult<Self> {
        check_sampling_rate(sampling_rate)?;
        Ok(Self {
            entries: Vec::new(),
            null_count: 0,
            observations: 0,
            sampling_rate,
        })
    }

    /// Builds a map from pairs already in ascending order.
    pub fn from_sorted<I>(pairs: I, null_count: u64, sampling_rate: f64) -> HistogramResult<Self>
    where
        I: IntoIterator<Item = (T, u64)>,
    {
        let mut map = Self::new(sampling_rate)?;
        for (value, count) in pairs {
            map.insert(value, count)?;
        }
        map.add_nulls(null_count)?;
        Ok(map)
    }

    /// Counts raw observations, `None` being a null.
    pub fn from_observations<I>(observations: I, sampling_rate: f64) -> HistogramResult<Self>
    where
        I: IntoIterator<Item = Option<T>>,
    {
        let mut map = Self::new(sampling_rate)?;
        let mut values = Vec::new();
        for observation in observations {
            match observation {
                Some(value) => {
                    value.check_domain().map_err(HistogramError::InvalidInput)?;
                    values.try_reserve(1)?;
                    values.push(value);
                }
                None => map.add_nulls(1)?,
            }
        }
        values.sort_by(|a, b| a.compare(b));
        map.add_observations(values.len() as u64)?;

        for value in values {
            match map.entries.last_mut() {
                Some((last, count)) if last.value_eq(&value) => *count += 1,
                _ => map.entries.push((value, 1)),
            }
        }
        Ok(map)
    }

    /// Appends a value, which must sort strictly after every value present.
    pub fn insert(&mut self, value: T, count: u64) -> HistogramResult<()> {
        if count == 0 {
            return Err(HistogramError::InvalidInput(format!("value {value:?} has a zero count")));
        }
        value.check_domain().map_err(HistogramError::InvalidInput)?;
        if let Some((last, _)) = self.entries.last() {
            if !last.value_lt(&value) {
                return Err(HistogramError::InvalidInput(format!("value map is not ascending: {value:?} follows {last:?}")));
            }
        }
        self.entries.try_reserve(1)?;
        self.add_observations(count)?;
        self.entries.push((value, count));
        Ok(())
    }

    pub fn add_nulls(&mut self, count: u64) -> HistogramResult<()> {
        self.add_observations(count)?;
        self.null_count += count;
        Ok(())
    }

    fn add_observations(&mut self, count: u64) -> HistogramResult<()> {
        self.observations = self
            .observations
            .checked_add(count)
            .ok_or_else(|| HistogramError::InvalidInput(format!("adding {count} observations overflows the total of {}", self.observations)))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn null_count(&self) -> u64 {
        self.null_count
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Sum of all non-null counts.
    pub fn total_count(&self) -> u64 {
        self.observations - self.null_count
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&T, u64)> + '_ {
        self.entries.iter().map(|(value, count)| (value, *count))
    }

    pub(crate) fn counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.iter().map(|(_, count)| *count)
    }

    pub(crate) fn entries(&self) -> &[(T, u64)] {
        &self.entries
    }
}
