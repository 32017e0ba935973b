use algebra_quest::{parse_rewrite, EGraph, Extractor, QuestGenerator, Random, Runner, Seed};
use codspeed_criterion_compat::{criterion_group, criterion_main, BenchmarkId, Criterion};

fn saturate_and_extract() {
    let mut egraph = EGraph::default();
    let terms: Vec<_> = ["a", "b", "c", "d"]
        .into_iter()
        .map(|t| egraph.add_term(t))
        .collect();
    let ab = egraph.add_operation("~>", [terms[0], terms[1]]);
    let cd = egraph.add_operation("~>", [terms[2], terms[3]]);
    egraph.add_operation("~>", [ab, cd]);

    Runner::default()
        .with_rule(parse_rewrite("comm", "$x ~> $y => $y ~> $x").unwrap())
        .with_rule(parse_rewrite("assoc", "($x ~> $y) ~> $z => $x ~> ($y ~> $z)").unwrap())
        .run(&mut egraph);
    let mut random = Random::new(0);
    Extractor::new(&egraph, &mut random).extract();
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("saturate and extract", |b| b.iter(saturate_and_extract));

    let generator = QuestGenerator::default();
    for value in [1u32, 42, 1234] {
        let seed = Seed::new(value);
        c.bench_with_input(BenchmarkId::new("generate", seed), &seed, |b, &seed| {
            b.iter(|| generator.generate(seed).unwrap())
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
