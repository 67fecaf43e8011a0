//! Word Factory Benchmarks
//!
//! The factory sits on hot runtime-internal paths (header construction,
//! address arithmetic), so boxing must stay at raw-move cost with the
//! reference backend.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use graphite_core::word::{
    fold_factory_op, FactoryOp, PointerWord, RawBoxer, SignedWord, UnsignedWord, WordBase,
    WordFactory,
};

fn bench_boxing(c: &mut Criterion) {
    let factory = WordFactory::new(Box::new(RawBoxer));
    let mut group = c.benchmark_group("word_boxing");

    group.bench_function("unsigned64", |b| {
        b.iter(|| {
            let w: UnsignedWord = factory.unsigned(black_box(0xdead_beef_cafe_f00d));
            black_box(w.raw())
        })
    });

    group.bench_function("unsigned32_zero_extend", |b| {
        b.iter(|| {
            let w: UnsignedWord = factory.unsigned32(black_box(0x8000_0001u32));
            black_box(w.raw())
        })
    });

    group.bench_function("signed32_sign_extend", |b| {
        b.iter(|| {
            let w: SignedWord = factory.signed32(black_box(-42));
            black_box(w.raw())
        })
    });

    group.bench_function("null_pointer", |b| {
        b.iter(|| {
            let w: PointerWord = factory.null_pointer();
            black_box(w.raw())
        })
    });

    group.finish();
}

fn bench_folding(c: &mut Criterion) {
    let mut group = c.benchmark_group("word_folding");

    group.bench_function("fold_all_ops", |b| {
        b.iter(|| {
            let mut acc = 0u64;
            for op in FactoryOp::ALL {
                acc ^= fold_factory_op(op, black_box(0xffff_ffff_8000_0001));
            }
            black_box(acc)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_boxing, bench_folding);
criterion_main!(benches);
