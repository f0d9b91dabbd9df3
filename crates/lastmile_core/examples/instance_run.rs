//! Run a small synthetic instance and export its metrics.
//!
//! ```sh
//! cargo run --example instance_run
//! ```

use lastmile_core::datasource::{CourierRow, InMemoryDataSource, OrderRow};
use lastmile_core::metrics_export::{
    write_courier_metrics_csv, write_order_metrics_csv, write_report_json,
};
use lastmile_core::scenario::{AcceptancePolicyKind, SimulationSettings};
use lastmile_core::world::run_simulation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Two hours of demand around central Berlin, one hour of courier supply.
    let orders: Vec<OrderRow> = (0..120)
        .map(|i| {
            let lat = 52.48 + 0.0008 * (i % 40) as f64;
            OrderRow {
                order_id: i + 1,
                pick_up_lat: lat,
                pick_up_lng: 13.38 + 0.0006 * (i % 25) as f64,
                drop_off_lat: lat + 0.01,
                drop_off_lng: 13.40,
                pick_up_lat2: lat,
                pick_up_lng2: 13.39,
                placement_time: 7 * 3600 + i * 60,
                expected_drop_off_time: 7 * 3600 + i * 60 + 2400,
                preparation_time: 300,
                ready_time: 7 * 3600 + i * 60 + 300,
            }
        })
        .collect();
    let couriers: Vec<CourierRow> = (0..25)
        .map(|i| CourierRow {
            courier_id: 1000 + i,
            vehicle: if i % 3 == 0 { "bicycle" } else { "motorcycle" }.to_string(),
            on_lat: 52.49 + 0.001 * (i % 10) as f64,
            on_lng: 13.39,
            on_time: 7 * 3600 + i * 120,
            off_time: 12 * 3600,
        })
        .collect();

    let mut settings = SimulationSettings::default()
        .with_simulate_from(7 * 3600)
        .with_simulate_until(13 * 3600)
        .with_seed(42)
        .with_acceptance_policy(AcceptancePolicyKind::Uniform);
    settings.dispatcher_prospects_max_distance_km = 5.0;

    let report = run_simulation(
        settings,
        Box::new(InMemoryDataSource::from_rows(orders, couriers)),
    );

    println!(
        "placed={} fulfilled={} canceled={} lost={}",
        report.orders_placed,
        report.orders_fulfilled,
        report.orders_canceled,
        report.lost_orders.len()
    );

    write_courier_metrics_csv("courier_metrics.csv", &report.courier_metrics)?;
    write_order_metrics_csv("order_metrics.csv", &report.order_metrics)?;
    write_report_json("report.json", &report)?;
    Ok(())
}
