//! Exporters write non-empty, well-formed files for a finished run.

mod support;

use lastmile_core::datasource::{CourierRow, InMemoryDataSource};
use lastmile_core::metrics_export::{
    write_courier_metrics_csv, write_courier_metrics_parquet, write_order_metrics_csv,
    write_order_metrics_parquet, write_report_json,
};
use lastmile_core::scenario::SimulationSettings;
use lastmile_core::world::run_simulation;

use support::world::order_row;

fn small_run() -> lastmile_core::world::SimulationReport {
    let mut settings = SimulationSettings::default()
        .with_simulate_from(0)
        .with_simulate_until(1200)
        .with_warm_up_time(0)
        .with_seed(7);
    settings.dispatcher_prospects_max_distance_km = 10.0;
    settings.order_pick_up_service_time = 30;
    settings.order_drop_off_service_time = 30;

    let orders = vec![
        order_row(1, 0, (52.50, 13.40), (52.51, 13.42)),
        order_row(2, 10, (52.505, 13.41), (52.515, 13.43)),
    ];
    let couriers = vec![CourierRow {
        courier_id: 100,
        vehicle: "bicycle".to_string(),
        on_lat: 52.50,
        on_lng: 13.40,
        on_time: 0,
        off_time: 1000,
    }];

    run_simulation(
        settings,
        Box::new(InMemoryDataSource::from_rows(orders, couriers)),
    )
}

#[test]
fn csv_exports_contain_one_row_per_record() {
    let report = small_run();
    let dir = tempfile::tempdir().expect("temp dir");

    let courier_path = dir.path().join("courier_metrics.csv");
    write_courier_metrics_csv(&courier_path, &report.courier_metrics).expect("courier csv");
    let contents = std::fs::read_to_string(&courier_path).expect("read courier csv");
    assert_eq!(contents.lines().count(), 1 + report.courier_metrics.len());
    assert!(contents.starts_with("courier_id,"));

    let order_path = dir.path().join("order_metrics.csv");
    write_order_metrics_csv(&order_path, &report.order_metrics).expect("order csv");
    let contents = std::fs::read_to_string(&order_path).expect("read order csv");
    assert_eq!(contents.lines().count(), 1 + report.order_metrics.len());
}

#[test]
fn parquet_exports_are_readable() {
    let report = small_run();
    let dir = tempfile::tempdir().expect("temp dir");

    let courier_path = dir.path().join("courier_metrics.parquet");
    write_courier_metrics_parquet(&courier_path, &report.courier_metrics).expect("courier parquet");
    let file = std::fs::File::open(&courier_path).expect("open parquet");
    let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)
        .expect("parquet reader")
        .build()
        .expect("build reader");
    let rows: usize = reader.map(|batch| batch.expect("batch").num_rows()).sum();
    assert_eq!(rows, report.courier_metrics.len());

    let order_path = dir.path().join("order_metrics.parquet");
    write_order_metrics_parquet(&order_path, &report.order_metrics).expect("order parquet");
    let file = std::fs::File::open(&order_path).expect("open parquet");
    let reader = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(file)
        .expect("parquet reader")
        .build()
        .expect("build reader");
    let rows: usize = reader.map(|batch| batch.expect("batch").num_rows()).sum();
    assert_eq!(rows, report.order_metrics.len());
}

#[test]
fn json_report_roundtrips() {
    let report = small_run();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("report.json");
    write_report_json(&path, &report).expect("json report");

    let contents = std::fs::read_to_string(&path).expect("read json");
    let value: serde_json::Value = serde_json::from_str(&contents).expect("parse json");
    assert_eq!(
        value["orders_placed"].as_u64(),
        Some(report.orders_placed)
    );
    assert!(value["courier_metrics"].is_array());
}
