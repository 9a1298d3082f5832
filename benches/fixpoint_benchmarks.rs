//! Benchmarks the fixpoint evaluator on a synthetic transitive-closure
//! workload and the WAT generator's throughput on a fact-heavy program.

use bytelog::config::{EngineConfig, WatConfig};
use bytelog::engine::Engine;
use bytelog::parser::parse_program;
use bytelog::wat_gen::generate_to_string;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn chain_source(length: usize) -> String {
    let mut src = String::from("REL parent\nREL anc\n");
    for i in 0..length {
        src.push_str(&format!("FACT parent {i} {}\n", i + 1));
    }
    src.push_str("RULE anc: SCAN parent, EMIT anc $0 $1\n");
    src.push_str("RULE anc: SCAN parent, JOIN anc $1, EMIT anc $0 $2\n");
    src.push_str("SOLVE\n");
    src
}

fn bench_fixpoint(c: &mut Criterion) {
    let source = chain_source(200);
    let program = parse_program(&source).unwrap();

    c.bench_function("fixpoint_transitive_closure_200", |b| {
        b.iter(|| {
            let mut engine = Engine::new(EngineConfig::default());
            engine.run(black_box(&program)).unwrap();
        });
    });
}

fn bench_wat_gen(c: &mut Criterion) {
    let mut src = String::from("REL r\n");
    for i in 0..500 {
        src.push_str(&format!("FACT r {i} {}\n", i + 1));
    }
    let program = parse_program(&src).unwrap();

    c.bench_function("wat_gen_500_facts", |b| {
        b.iter(|| {
            generate_to_string(black_box(&program), WatConfig::default()).unwrap();
        });
    });
}

criterion_group!(benches, bench_fixpoint, bench_wat_gen);
criterion_main!(benches);
