use std::sync::Arc;

use ah_core::engine::controller::{build_controller, ControllerSetup};
use ah_core::engine::puck_simulation::{SimulationConfig, TableSimulation};
use ah_core::engine::timestep::FRAME_INTERVAL_US;
use ah_core::{ControlLoop, EngineConfig, TickInput, Vec2, WorldModel};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn closed_loop(config: &EngineConfig, sim_config: SimulationConfig) -> (ControlLoop, TableSimulation) {
    let world = Arc::new(WorldModel::from_config(config));
    let controller = build_controller(ControllerSetup::Simulated, &config);
    let mut control = ControlLoop::new(config.clone(), world, controller);
    control.initialize(0).expect("default table is valid");
    let sim = TableSimulation::new(config, sim_config, 7).expect("valid simulation");
    (control, sim)
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_loop");
    let config = EngineConfig::default();

    group.bench_function("tick_incoming_shot", |b| {
        let (mut control, mut sim) = closed_loop(&config, SimulationConfig::default());
        sim.place_puck(Vec2::new(1.0, 0.9), Vec2::new(1.5, -0.3));
        let mut now = 0u64;
        b.iter(|| {
            now += FRAME_INTERVAL_US;
            sim.advance_to(now);
            control.world().ingest_frame(&sim.observe());
            let report = control.tick(now, &TickInput::default()).expect("simulated controller");
            sim.set_own_mallet(&report.mallet);
            black_box(report);
        });
    });

    group.bench_function("plan_with_evasion", |b| {
        let still = SimulationConfig { opponent_speed_mps: 0.0, ..SimulationConfig::default() };
        let (mut control, mut sim) = closed_loop(&config, still);
        sim.place_opponent(Vec2::new(1.6, 0.65));
        sim.place_puck(Vec2::new(1.4, 0.65), Vec2::zeros());
        let mut now = 0u64;
        b.iter(|| {
            now += FRAME_INTERVAL_US;
            sim.advance_to(now);
            control.world().ingest_frame(&sim.observe());
            black_box(control.tick(now, &TickInput::default()).expect("simulated controller"));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
