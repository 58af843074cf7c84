use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use embodied_bt::{
    bridge::{PrimitiveBridge, SymbolicBackend},
    driver::{SimulatedClock, TickDriver},
    engine::BehaviorTree,
    parse_plan, resolve,
};

fn kitchen_plan(steps: usize) -> String {
    let body: String = (0..steps)
        .map(|i| {
            format!(
                r#"<SubTree ID="T_Navigate" target="item_{i}"/>
                   <Action ID="GRASP" obj="item_{i}"/>
                   <SubTree ID="T_Navigate" target="table"/>
                   <Action ID="PLACE_ON_TOP" obj="table"/>
                   <Action ID="RELEASE"/>"#
            )
        })
        .collect();
    format!(
        r#"<root main_tree_to_execute="MainTree">
             <BehaviorTree ID="MainTree"><Sequence>{}</Sequence></BehaviorTree>
             <BehaviorTree ID="T_Navigate"><Action ID="NAVIGATE_TO" obj="{{target}}"/></BehaviorTree>
           </root>"#,
        body
    )
}

fn bench_parse(c: &mut Criterion) {
    let text = kitchen_plan(50);
    c.bench_function("parse 250 node plan", |b| {
        b.iter(|| parse_plan(black_box(&text)).unwrap())
    });
}

fn bench_tick(c: &mut Criterion) {
    let plan = parse_plan(&kitchen_plan(50)).unwrap();
    let resolved = resolve(&plan).unwrap();
    c.bench_function("tick 250 node plan to completion", |b| {
        b.iter(|| {
            let mut tree = BehaviorTree::build(&resolved).unwrap();
            let mut bridge = PrimitiveBridge::new(SymbolicBackend::default());
            let mut clock = SimulatedClock::new(Duration::from_millis(100));
            TickDriver::new(10_000).run(&mut tree, &mut bridge, &mut clock)
        })
    });
}

criterion_group!(benches, bench_parse, bench_tick);
criterion_main!(benches);
