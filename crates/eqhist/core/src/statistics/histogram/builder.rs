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

//! Greedy single-pass construction of equi-height buckets.

use tracing::debug;

use super::bucket::Bucket;
use super::error::HistogramResult;
use super::sizer::find_bucket_size;
use crate::statistics::value::HistogramValue;
use crate::statistics::value_map::ValueMap;

/// Guaranteed-Error Estimator for the number of distinct values in a bucket.
///
/// Only values seen exactly once in the sample are scaled up by
/// `sqrt(1 / sampling_rate)`; values seen more often are assumed to have all
/// been seen. Never returns less than 1.
pub fn estimate_ndv(distinct: u64, unary: u64, sampling_rate: f64) -> u64 {
    if distinct <= 1 {
        return 1;
    }
    let scaled = ((1.0 / sampling_rate).sqrt() * unary as f64).round() as u64;
    scaled.saturating_add(distinct - unary).max(1)
}

/// Running totals for the bucket currently being packed
#[derive(Debug, Default)]
struct OpenBucket {
    observations: u64,
    distinct: u64,
    unary: u64,
}

impl OpenBucket {
    fn add(&mut self, count: u64) {
        self.observations += count;
        self.distinct += 1;
        if count == 1 {
            self.unary += 1;
        }
    }
}

/// Packs `value_map` into at most `max_buckets` buckets.
///
/// The caller guarantees `max_buckets >= 1`. Endpoints are cloned out of the
/// value map so the result does not borrow from it. Returns no buckets for an
/// empty value map.
pub fn build_buckets<T: HistogramValue>(value_map: &ValueMap<T>, max_buckets: usize) -> HistogramResult<Vec<Bucket<T>>> {
    let entries = value_map.entries();
    let mut buckets = Vec::new();
    if entries.is_empty() {
        return Ok(buckets);
    }
    buckets.try_reserve_exact(max_buckets.min(entries.len()))?;

    let total = (value_map.null_count() + value_map.total_count()) as f64;
    let bucket_size = find_bucket_size(value_map, max_buckets);

    let mut cumulative = 0u64;
    let mut open = OpenBucket::default();
    let mut lower = &entries[0].0;
    let mut remaining = entries.len();
    let mut empty_buckets = max_buckets;

    for (i, (value, count)) in entries.iter().enumerate() {
        cumulative += count;
        open.add(*count);
        remaining -= 1;

        let next = entries.get(i + 1);
        let close = match next {
            None => true,
            // Every value left can have a bucket of its own.
            Some(_) if remaining < empty_buckets => true,
            Some((_, next_count)) => open.observations + next_count > bucket_size,
        };
        if !close {
            continue;
        }

        buckets.push(Bucket::new(
            lower.clone(),
            value.clone(),
            cumulative as f64 / total,
            estimate_ndv(open.distinct, open.unary, value_map.sampling_rate()),
        ));
        empty_buckets = empty_buckets.saturating_sub(1);
        open = OpenBucket::default();
        if let Some((next_value, _)) = next {
            lower = next_value;
        }
    }

    debug!(
        values = entries.len(),
        requested = max_buckets,
        emitted = buckets.len(),
        bucket_size,
        "built equi-height buckets"
    );
    Ok(buckets)
}
