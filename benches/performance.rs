// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use finmesh::fin::{configure, tag_regions};
use finmesh::{FinGeometry, FinParams, Kernel, MeshConfig};

fn fin_params(n_fins: usize) -> FinParams {
    FinParams {
        n_fins,
        ..FinParams::default()
    }
}

fn bench_fragment(c: &mut Criterion) {
    let mut group = c.benchmark_group("fragment");

    for n_fins in [4, 16, 64] {
        let params = fin_params(n_fins);
        group.bench_with_input(BenchmarkId::new("fins", n_fins), &params, |b, params| {
            let mut kernel = Kernel::acquire();
            b.iter(|| {
                kernel.add_model("fin");
                let mut geometry = FinGeometry::build(&mut kernel, black_box(params)).unwrap();
                geometry.fragment(&mut kernel).unwrap().entities.len()
            });
        });
    }

    group.finish();
}

fn bench_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("mesh");
    group.sample_size(10);

    for lc in [0.4, 0.2, 0.1] {
        let params = fin_params(4);
        let config = MeshConfig {
            lc,
            ..MeshConfig::default()
        };
        group.bench_with_input(BenchmarkId::new("lc", lc), &config, |b, config| {
            let mut kernel = Kernel::acquire();
            kernel.add_model("fin");
            let mut geometry = FinGeometry::build(&mut kernel, &params).unwrap();
            geometry.fragment(&mut kernel).unwrap();
            let regions = tag_regions(&mut kernel, &geometry, &params).unwrap();
            configure(&mut kernel, &regions, config, params.thickness).unwrap();

            b.iter(|| kernel.generate_mesh(black_box(2)).unwrap().triangle_count());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fragment, bench_mesh);
criterion_main!(benches);
