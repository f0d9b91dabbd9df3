//! Performance benchmarks for lastmile_core using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use lastmile_core::datasource::{CourierRow, InMemoryDataSource, OrderRow};
use lastmile_core::policies::matching::{DispatcherMatchingPolicy, GreedyMatchingPolicy};
use lastmile_core::policies::{MatchingCourier, MatchingOrder};
use lastmile_core::routing::HaversineRoutingClient;
use lastmile_core::scenario::SimulationSettings;
use lastmile_core::spatial::Location;
use lastmile_core::world::run_simulation;

fn order_row(order_id: u64, placement_time: u64, lat: f64) -> OrderRow {
    OrderRow {
        order_id,
        pick_up_lat: lat,
        pick_up_lng: 13.40,
        drop_off_lat: lat,
        drop_off_lng: 13.44,
        pick_up_lat2: lat,
        pick_up_lng2: 13.40,
        placement_time,
        expected_drop_off_time: placement_time + 1800,
        preparation_time: 120,
        ready_time: placement_time + 120,
    }
}

fn bench_simulation_run(c: &mut Criterion) {
    let scenarios: Vec<(&str, u64, u64)> =
        vec![("small", 20, 5), ("medium", 100, 20), ("large", 400, 80)];

    let mut group = c.benchmark_group("simulation_run");
    for (name, order_count, courier_count) in scenarios {
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &(order_count, courier_count),
            |b, &(order_count, courier_count)| {
                b.iter(|| {
                    let orders: Vec<OrderRow> = (0..order_count)
                        .map(|i| order_row(i + 1, (i * 7) % 3600, 52.50 + 0.0005 * i as f64))
                        .collect();
                    let couriers: Vec<CourierRow> = (0..courier_count)
                        .map(|i| CourierRow {
                            courier_id: 10_000 + i,
                            vehicle: "motorcycle".to_string(),
                            on_lat: 52.50 + 0.001 * i as f64,
                            on_lng: 13.41,
                            on_time: 0,
                            off_time: 3 * 3600,
                        })
                        .collect();

                    let mut settings = SimulationSettings::default()
                        .with_simulate_from(0)
                        .with_simulate_until(4 * 3600)
                        .with_seed(42);
                    settings.dispatcher_prospects_max_distance_km = 10.0;

                    black_box(run_simulation(
                        settings,
                        Box::new(InMemoryDataSource::from_rows(orders, couriers)),
                    ));
                });
            },
        );
    }
    group.finish();
}

fn bench_greedy_matching(c: &mut Criterion) {
    use bevy_ecs::prelude::Entity;
    use lastmile_core::ecs::{CourierCondition, Vehicle};

    let orders: Vec<MatchingOrder> = (0..50)
        .map(|i| MatchingOrder {
            entity: Entity::from_raw(i),
            order_id: i as u64,
            pick_up_at: Location::new(52.50 + 0.0004 * i as f64, 13.40),
            drop_off_at: Location::new(52.50 + 0.0004 * i as f64, 13.43),
            pick_up_service_time: 120,
            drop_off_service_time: 120,
        })
        .collect();
    let couriers: Vec<MatchingCourier> = (0..100)
        .map(|i| MatchingCourier {
            entity: Entity::from_raw(1000 + i),
            courier_id: i as u64,
            location: Location::new(52.50 + 0.0003 * i as f64, 13.41),
            vehicle: Vehicle::motorcycle(),
            condition: CourierCondition::Idle,
            has_active_route: false,
            notified: false,
        })
        .collect();

    c.bench_function("greedy_matching_50x100", |b| {
        let policy = GreedyMatchingPolicy::new(5.0);
        b.iter(|| {
            black_box(policy.execute(&orders, &couriers, &HaversineRoutingClient));
        });
    });
}

criterion_group!(benches, bench_simulation_run, bench_greedy_matching);
criterion_main!(benches);
