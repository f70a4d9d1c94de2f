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
use eqhist_core::statistics::{EquiHeight, HistogramError, Predicate, ValueMap};

const EPS: f64 = 1e-9;

fn build(pairs: &[(i64, u64)], nulls: u64, sampling_rate: f64, num_buckets: usize) -> EquiHeight<i64> {
    let map = ValueMap::from_sorted(pairs.iter().copied(), nulls, sampling_rate).unwrap();
    EquiHeight::build(&map, num_buckets).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < EPS, "expected {expected}, got {actual}");
}

#[test]
fn test_all_nulls() {
    let h = build(&[], 100, 1.0, 8);

    assert_eq!(h.num_buckets(), 0);
    assert_eq!(h.null_values_fraction(), 1.0);
    for probe in [-1, 0, 42] {
        assert_eq!(h.equal_to(&probe), 0.0);
        assert_eq!(h.less_than(&probe), 0.0);
        assert_eq!(h.greater_than(&probe), 0.0);
    }
    assert_eq!(h.selectivity(&Predicate::IsNull), 1.0);
}

#[test]
fn test_singletons_dominate() {
    let h = build(&[(1, 1), (2, 1), (3, 1), (4, 1)], 0, 1.0, 8);

    assert_eq!(h.num_buckets(), 4);
    for (bucket, expected) in h.buckets().iter().zip([0.25, 0.5, 0.75, 1.0]) {
        assert!(bucket.is_singleton());
        assert_eq!(bucket.num_distinct(), 1);
        assert_close(bucket.cumulative_frequency(), expected);
    }
    assert_close(h.equal_to(&3), 0.25);
    assert_close(h.less_than(&3), 0.5);
    assert_close(h.greater_than(&3), 0.25);
}

#[test]
fn test_heavy_hitter() {
    let h = build(&[(1, 1), (2, 1), (3, 97), (4, 1)], 0, 1.0, 4);

    let heavy = h.buckets().iter().find(|b| b.contains(&3)).unwrap();
    assert!(heavy.is_singleton());
    assert_close(h.equal_to(&3), 0.97);
    assert_close(h.equal_to(&2), 0.01);
    assert_close(h.less_than(&3), 0.02);
    assert_close(h.greater_than(&3), 0.01);
}

#[test]
fn test_packing_required() {
    let pairs: Vec<(i64, u64)> = (1..=100).map(|i| (i, 1)).collect();
    let h = build(&pairs, 0, 1.0, 10);

    assert_eq!(h.num_buckets(), 10);
    assert_eq!(h.num_distinct_values(), 100);
    for bucket in h.buckets() {
        let width = bucket.upper_inclusive() - bucket.lower_inclusive() + 1;
        assert!((8..=12).contains(&width), "bucket width {width}");
    }
    assert!((h.less_than(&55) - 0.54).abs() <= 0.1);
}

#[test]
fn test_sampling_scales_distinct_values() {
    let h = build(&[(1, 5), (2, 5), (3, 1), (4, 1), (5, 1)], 0, 0.1, 3);

    let bucket = h.buckets().iter().find(|b| b.contains(&4)).unwrap();
    assert_eq!(*bucket.lower_inclusive(), 3);
    assert_eq!(*bucket.upper_inclusive(), 5);
    assert_eq!(bucket.num_distinct(), 9);
}

#[test]
fn test_round_trip_with_nulls() {
    let pairs: Vec<(i64, u64)> = (0..50).map(|i| (i * 3, 1 + (i as u64 * 7) % 5)).collect();
    let h = build(&pairs, 13, 0.5, 12);
    assert!(h.null_values_fraction() > 0.0);

    let doc = h.to_document();
    let decoded = EquiHeight::<i64>::from_document(&doc, false).unwrap();
    assert_eq!(decoded.buckets(), h.buckets());
    assert_eq!(decoded.null_values_fraction(), h.null_values_fraction());
    assert_eq!(decoded.sampling_rate(), h.sampling_rate());
    assert_eq!(decoded.num_buckets_specified(), h.num_buckets_specified());
    assert_eq!(decoded.collation_id(), h.collation_id());
    assert_eq!(decoded.last_updated(), h.last_updated());
    assert_eq!(decoded, h);

    let text = h.to_json_string().unwrap();
    assert_eq!(EquiHeight::<i64>::from_json_str(&text, false).unwrap(), h);
    assert_eq!(EquiHeight::<i64>::from_bytes(&h.to_bytes().unwrap()).unwrap(), h);
}

#[test]
fn test_composite_buckets_respect_bucket_size() {
    let pairs: Vec<(i64, u64)> = (0..200).map(|i| (i, 1 + (i as u64 * 31) % 11)).collect();
    let map = ValueMap::from_sorted(pairs.iter().copied(), 0, 1.0).unwrap();
    let bucket_size = find_bucket_size(&map, 16);
    let h = EquiHeight::build(&map, 16).unwrap();

    assert!(h.num_buckets() <= 16);
    for bucket in h.buckets().iter().filter(|b| !b.is_singleton()) {
        let size: u64 = pairs.iter().filter(|(v, _)| bucket.contains(v)).map(|(_, c)| c).sum();
        assert!(size <= bucket_size, "bucket holds {size} > {bucket_size}");
    }
}

#[test]
fn test_invalid_input() {
    let map = ValueMap::from_sorted(vec![(1i64, 1)], 0, 1.0).unwrap();
    assert!(matches!(EquiHeight::build(&map, 0), Err(HistogramError::InvalidInput(_))));
    assert!(matches!(ValueMap::<i64>::new(0.0), Err(HistogramError::InvalidInput(_))));
    assert!(matches!(
        ValueMap::from_sorted(vec![(2i64, 1), (1, 1)], 0, 1.0),
        Err(HistogramError::InvalidInput(_))
    ));
}

#[test]
fn test_string_column() {
    let words = ["apple", "banana", "cherry", "damson", "elderberry", "fig", "grape", "honeydew"];
    let observations = words.iter().flat_map(|w| std::iter::repeat_n(Some(w.to_string()), w.len())).chain([None, None]);
    let map = ValueMap::from_observations(observations, 1.0).unwrap();
    let h = EquiHeight::build(&map, 3).unwrap();

    assert!(h.num_buckets() <= 3);
    let total: usize = words.iter().map(|w| w.len()).sum::<usize>() + 2;
    assert_close(h.null_values_fraction(), 2.0 / total as f64);
    assert_eq!(h.equal_to(&"kiwi".to_string()), 0.0);
    assert!(h.less_than(&"cherry".to_string()) <= h.less_than(&"fig".to_string()));
    assert_close(h.less_than(&"zzz".to_string()), h.non_null_values_fraction());

    let decoded = EquiHeight::<String>::from_document(&h.to_document(), false).unwrap();
    assert_eq!(decoded, h);
}
