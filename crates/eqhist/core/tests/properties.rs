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

use eqhist_core::statistics::histogram::find_bucket_size;
use eqhist_core::statistics::{EquiHeight, ValueMap};
use proptest::{prelude::*, proptest};

const EPS: f64 = 1e-9;

/// Ascending values with arbitrary gaps between them.
fn sparse_pairs() -> impl Strategy<Value = Vec<(i64, u64)>> {
    prop::collection::vec((1i64..20, 1u64..60), 0..120).prop_map(|steps| {
        let mut value = -500i64;
        steps
            .into_iter()
            .map(|(gap, count)| {
                value += gap;
                (value, count)
            })
            .collect()
    })
}

/// Consecutive values, so every composite bucket holds all of its points.
fn dense_pairs() -> impl Strategy<Value = Vec<(i64, u64)>> {
    prop::collection::vec(1u64..40, 1..120).prop_map(|counts| counts.into_iter().enumerate().map(|(i, c)| (i as i64, c)).collect())
}

/// Distinct strings in byte order, each with a positive count.
fn string_pairs() -> impl Strategy<Value = Vec<(String, u64)>> {
    (prop::collection::btree_set("[a-z]{0,12}", 0..60), prop::collection::vec(1u64..50, 60))
        .prop_map(|(values, counts)| values.into_iter().zip(counts).collect())
}

/// Distinct finite doubles in ascending order, each with a positive count.
fn double_pairs() -> impl Strategy<Value = Vec<(f64, u64)>> {
    (prop::collection::vec(-1e12f64..1e12, 0..80), prop::collection::vec(1u64..50, 80)).prop_map(|(mut values, counts)| {
        values.sort_by(f64::total_cmp);
        values.dedup_by(|a, b| a.total_cmp(b).is_eq());
        values.into_iter().zip(counts).collect()
    })
}

fn sampling_rate() -> impl Strategy<Value = f64> {
    prop_oneof![Just(1.0), Just(0.5), Just(0.1), Just(0.01)]
}

proptest! {
    #[test]
    fn property_bucket_invariants(pairs in sparse_pairs(), nulls in 0u64..200, n in 1usize..64, rate in sampling_rate()) {
        let map = ValueMap::from_sorted(pairs.clone(), nulls, rate).unwrap();
        let h = EquiHeight::build(&map, n).unwrap();
        let buckets = h.buckets();

        prop_assert!(buckets.len() <= n);
        prop_assert_eq!(buckets.is_empty(), pairs.is_empty());
        for bucket in buckets {
            prop_assert!(bucket.lower_inclusive() <= bucket.upper_inclusive());
            prop_assert!(bucket.num_distinct() >= 1);
            if bucket.is_singleton() {
                prop_assert_eq!(bucket.num_distinct(), 1);
            }
        }
        for pair in buckets.windows(2) {
            prop_assert!(pair[0].upper_inclusive() <= pair[1].lower_inclusive());
            prop_assert!(pair[0].cumulative_frequency() < pair[1].cumulative_frequency());
        }
        if let Some(last) = buckets.last() {
            prop_assert!((last.cumulative_frequency() + h.null_values_fraction() - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn property_composite_buckets_fit(pairs in sparse_pairs(), n in 2usize..64) {
        let map = ValueMap::from_sorted(pairs.clone(), 0, 1.0).unwrap();
        let bucket_size = find_bucket_size(&map, n);
        let h = EquiHeight::build(&map, n).unwrap();

        for bucket in h.buckets().iter().filter(|b| !b.is_singleton()) {
            let size: u64 = pairs.iter().filter(|(v, _)| bucket.contains(v)).map(|(_, c)| c).sum();
            prop_assert!(size <= bucket_size);
        }
    }

    #[test]
    fn property_selectivity_identities(pairs in sparse_pairs(), nulls in 0u64..200, n in 1usize..32, probe in -520i64..2000) {
        let map = ValueMap::from_sorted(pairs, nulls, 1.0).unwrap();
        let h = EquiHeight::build(&map, n).unwrap();
        let non_null = h.non_null_values_fraction();

        let eq = h.equal_to(&probe);
        let lt = h.less_than(&probe);
        let gt = h.greater_than(&probe);
        for s in [eq, lt, gt] {
            prop_assert!((0.0..=non_null).contains(&s));
        }
        prop_assert!((eq + h.not_equal_to(&probe) - non_null).abs() < EPS);
        prop_assert!((h.less_than_or_equal(&probe) - (lt + eq).min(non_null)).abs() < EPS);
        prop_assert!((h.greater_than_or_equal(&probe) - (gt + eq).min(non_null)).abs() < EPS);
    }

    #[test]
    fn property_mass_partitions(pairs in dense_pairs(), nulls in 0u64..200, n in 1usize..32, probe in -5i64..130) {
        let map = ValueMap::from_sorted(pairs, nulls, 1.0).unwrap();
        let h = EquiHeight::build(&map, n).unwrap();

        let total = h.less_than(&probe) + h.equal_to(&probe) + h.greater_than(&probe);
        prop_assert!((total - h.non_null_values_fraction()).abs() < 1e-6);
    }

    #[test]
    fn property_less_than_is_monotone(pairs in sparse_pairs(), n in 1usize..32, a in -520i64..2000, b in -520i64..2000) {
        let map = ValueMap::from_sorted(pairs, 0, 1.0).unwrap();
        let h = EquiHeight::build(&map, n).unwrap();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

        prop_assert!(h.less_than(&lo) <= h.less_than(&hi) + EPS);
        prop_assert!(h.greater_than(&lo) + EPS >= h.greater_than(&hi));
    }

    #[test]
    fn property_document_round_trip(pairs in sparse_pairs(), nulls in 0u64..200, n in 1usize..64, rate in sampling_rate()) {
        let map = ValueMap::from_sorted(pairs, nulls, rate).unwrap();
        let h = EquiHeight::build(&map, n).unwrap();

        let decoded = EquiHeight::<i64>::from_document(&h.to_document(), false).unwrap();
        prop_assert_eq!(&decoded, &h);
        let reparsed = EquiHeight::<i64>::from_json_str(&h.to_json_string().unwrap(), false).unwrap();
        prop_assert_eq!(&reparsed, &h);
    }

    #[test]
    fn property_string_document_round_trip(pairs in string_pairs(), nulls in 0u64..200, n in 1usize..32, rate in sampling_rate()) {
        let map = ValueMap::from_sorted(pairs, nulls, rate).unwrap();
        let h = EquiHeight::build(&map, n).unwrap();

        let decoded = EquiHeight::<String>::from_document(&h.to_document(), false).unwrap();
        prop_assert_eq!(&decoded, &h);
        prop_assert_eq!(&EquiHeight::<String>::from_bytes(&h.to_bytes().unwrap()).unwrap(), &h);
    }

    #[test]
    fn property_double_document_round_trip(pairs in double_pairs(), nulls in 0u64..200, n in 1usize..32, rate in sampling_rate()) {
        let map = ValueMap::from_sorted(pairs, nulls, rate).unwrap();
        let h = EquiHeight::build(&map, n).unwrap();

        let reparsed = EquiHeight::<f64>::from_json_str(&h.to_json_string().unwrap(), false).unwrap();
        prop_assert_eq!(&reparsed, &h);
    }
}
