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

//! Histogram construction and selectivity benchmarks

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use eqhist_core::statistics::{EquiHeight, ValueMap};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Skewed integer column: a handful of heavy values over a uniform tail.
fn skewed_map(distinct: usize) -> ValueMap<i64> {
    let mut rng = StdRng::seed_from_u64(42);
    let pairs = (0..distinct).map(|i| {
        let count = if rng.gen_ratio(1, 50) { rng.gen_range(1_000..10_000) } else { rng.gen_range(1..20) };
        (i as i64 * 3, count)
    });
    ValueMap::from_sorted(pairs, 1_000, 1.0).unwrap()
}

/// Benchmark histogram construction across input sizes
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("equi_height_build");

    for distinct in [1_000usize, 10_000, 100_000] {
        let map = skewed_map(distinct);
        group.throughput(Throughput::Elements(distinct as u64));
        group.bench_with_input(BenchmarkId::from_parameter(distinct), &map, |b, map| b.iter(|| EquiHeight::build(black_box(map), 1024).unwrap()));
    }

    group.finish();
}

/// Benchmark point and range selectivity queries
fn bench_selectivity(c: &mut Criterion) {
    let histogram = EquiHeight::build(&skewed_map(100_000), 1024).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let probes: Vec<i64> = (0..1024).map(|_| rng.gen_range(-100..310_000)).collect();

    let mut group = c.benchmark_group("equi_height_selectivity");
    group.throughput(Throughput::Elements(probes.len() as u64));

    group.bench_function("equal_to", |b| b.iter(|| probes.iter().map(|p| histogram.equal_to(black_box(p))).sum::<f64>()));
    group.bench_function("less_than", |b| b.iter(|| probes.iter().map(|p| histogram.less_than(black_box(p))).sum::<f64>()));
    group.bench_function("greater_than", |b| b.iter(|| probes.iter().map(|p| histogram.greater_than(black_box(p))).sum::<f64>()));

    group.finish();
}

/// Benchmark document encode and decode
fn bench_document(c: &mut Criterion) {
    let histogram = EquiHeight::build(&skewed_map(100_000), 1024).unwrap();
    let doc = histogram.to_document();
    let bytes = histogram.to_bytes().unwrap();

    let mut group = c.benchmark_group("equi_height_document");
    group.bench_function("to_document", |b| b.iter(|| black_box(&histogram).to_document()));
    group.bench_function("from_document_untrusted", |b| b.iter(|| EquiHeight::<i64>::from_document(black_box(&doc), false).unwrap()));
    group.bench_function("from_bytes", |b| b.iter(|| EquiHeight::<i64>::from_bytes(black_box(&bytes)).unwrap()));
    group.finish();
}

criterion_group!(benches, bench_build, bench_selectivity, bench_document);
criterion_main!(benches);
