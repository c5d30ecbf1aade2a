use criterion::{criterion_group, criterion_main, Criterion};
use lalrgen::{
    generate,
    grammar::{Grammar, GrammarDef, GrammarDefError},
    Config,
};
use lalrgen_tests::grammars;
use std::hint::black_box;

criterion_main!(benches);
criterion_group!(benches, bench_simple, bench_calc, bench_min_caml);

fn bench_simple(c: &mut Criterion) {
    bench_generate(c, "g_simple1", grammars::g_simple1);
    bench_generate(c, "g_simple2", grammars::g_simple2);
    bench_generate(c, "g2", grammars::g2);
    bench_generate(c, "g4", grammars::g4);
}

fn bench_calc(c: &mut Criterion) {
    bench_generate(c, "calc", grammars::calc);
}

fn bench_min_caml(c: &mut Criterion) {
    bench_generate(c, "min_caml", grammars::min_caml);
}

fn bench_generate(
    c: &mut Criterion,
    name: &str,
    f: impl FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarDefError>,
) {
    let grammar = Grammar::define(f).unwrap();
    let config = Config::new();
    c.bench_function(name, |b| {
        b.iter(|| {
            let _generated = black_box(generate(&grammar, &config).unwrap());
        });
    });
}
