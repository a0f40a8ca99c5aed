// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Benchmarks for `Nfa::consume`.
//!
//! Measures per-record throughput of a three-step pattern with one
//! dependent constraint under both supported strategies. Records are
//! encoded once outside the timed loop; each iteration builds a fresh
//! automaton so buffers start empty.
#![allow(missing_docs, clippy::cast_possible_truncation)]

use cep::automaton::Nfa;
use cep::common::schema::EventSchema;
use cep::condition::dependent::DependentConstraint;
use cep::condition::independent::IndependentConstraint;
use cep::condition::CmpOp;
use cep::pattern::{CompiledPattern, MatchStrategy};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

fn make_records(schema: &mut EventSchema, n: usize) -> Vec<Vec<u8>> {
    (0..n)
        .map(|i| {
            let ty = ["A", "B", "C", "D"][i % 4];
            let value = format!("{}.{}", (i * 7) % 100, i % 10);
            schema
                .encode(&[ty, &((i * 13) % 50).to_string(), &value, &i.to_string()])
                .unwrap()
        })
        .collect()
}

fn pattern(strategy: MatchStrategy) -> CompiledPattern {
    CompiledPattern::new(64, strategy)
        .with_sequence(&[("A", "a"), ("B", "b"), ("C", "c")])
        .with_independent("a", IndependentConstraint::at_most("n", 40))
        .with_dependent(DependentConstraint::new("v", "c", CmpOp::Ge, "a"))
}

fn bench_consume(c: &mut Criterion) {
    let mut group = c.benchmark_group("nfa_consume");

    for strategy in [MatchStrategy::SkipTillNextMatch, MatchStrategy::SkipTillAnyMatch] {
        for &n in &[1_000_usize, 10_000, 100_000] {
            let mut schema = EventSchema::new(
                "synthetic",
                &[("type", "TYPE"), ("n", "INT"), ("v", "DOUBLE.1"), ("time", "TIMESTAMP")],
            )
            .unwrap();
            let records = make_records(&mut schema, n);
            let compiled = pattern(strategy);

            group.throughput(Throughput::Elements(n as u64));
            group.bench_with_input(
                BenchmarkId::new(strategy.as_str(), n),
                &records,
                |b, records| {
                    b.iter(|| {
                        let mut nfa = Nfa::from_pattern(&compiled).unwrap();
                        for record in records {
                            nfa.consume(&schema, black_box(record)).unwrap();
                        }
                        black_box(nfa.count_tuples())
                    });
                },
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_consume);
criterion_main!(benches);
