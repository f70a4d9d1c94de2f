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

//! Chooses the maximum composite bucket size for the greedy builder.
//!
//! A greedy left-to-right pack with bucket size `K` closes a bucket as soon as
//! the next count would push it past `K`. The number of buckets used only
//! shrinks as `K` grows, so the smallest `K` that fits in `N` buckets can be
//! found with a binary search between 0 and a proven upper bound.

use tracing::debug;

use crate::statistics::value::HistogramValue;
use crate::statistics::value_map::ValueMap;

const MAX_SEARCH_ITERATIONS: usize = 10;

/// Whether a greedy pack with maximum composite bucket size `max_bucket_size`
/// needs at most `max_buckets` buckets. A count larger than the bucket size
/// still fits, alone in its own bucket.
pub fn fits<I>(counts: I, max_bucket_size: u64, max_buckets: usize) -> bool
where
    I: IntoIterator<Item = u64>,
{
    let mut used = 0usize;
    let mut current = 0u64;
    for count in counts {
        if current > 0 && current.saturating_add(count) > max_bucket_size {
            used += 1;
            current = 0;
        }
        current = current.saturating_add(count);
    }
    if current > 0 {
        used += 1;
    }
    used <= max_buckets
}

/// Upper bound on the bucket size for which a greedy pack is guaranteed to
/// fit in `max_buckets >= 2` buckets.
fn upper_bound(total: u64, max_buckets: usize) -> u64 {
    let gaps = (max_buckets - 1) as u128;
    // Any size of at least `total` packs everything into one bucket.
    u64::try_from((2 * total as u128).div_ceil(gaps) + 1).unwrap_or(u64::MAX)
}

/// Smallest maximum composite bucket size for which the greedy pack of
/// `value_map` uses at most `max_buckets` buckets.
pub fn find_bucket_size<T: HistogramValue>(value_map: &ValueMap<T>, max_buckets: usize) -> u64 {
    let total = value_map.total_count();
    if max_buckets <= 1 {
        return total;
    }

    let mut hi = upper_bound(total, max_buckets);
    let mut lo = 0u64;
    debug_assert!(fits(value_map.counts(), hi, max_buckets));

    for _ in 0..MAX_SEARCH_ITERATIONS {
        if hi <= lo + 1 {
            break;
        }
        let mid = lo + (hi - lo) / 2;
        if fits(value_map.counts(), mid, max_buckets) {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    debug!(total, max_buckets, bucket_size = hi, "chose maximum bucket size");
    hi
}
