//! Exporters for the post-run metric records: CSV, Parquet, and a JSON dump
//! of the whole report.

use std::error::Error;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, UInt32Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use crate::metrics::{CourierMetricsRecord, OrderMetricsRecord};
use crate::world::SimulationReport;

fn u64_field(name: &'static str) -> Field {
    Field::new(name, DataType::UInt64, false)
}

fn nullable_u64_field(name: &'static str) -> Field {
    Field::new(name, DataType::UInt64, true)
}

fn f64_field(name: &'static str) -> Field {
    Field::new(name, DataType::Float64, false)
}

fn nullable_f64_field(name: &'static str) -> Field {
    Field::new(name, DataType::Float64, true)
}

fn write_record_batch<P: AsRef<Path>>(
    path: P,
    schema: Schema,
    arrays: Vec<ArrayRef>,
) -> Result<(), Box<dyn Error>> {
    let schema = Arc::new(schema);
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn optional_string<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|inner| inner.to_string())
        .unwrap_or_default()
}

/// Write courier metrics as CSV, one row per courier.
pub fn write_courier_metrics_csv<P: AsRef<Path>>(
    path: P,
    records: &[CourierMetricsRecord],
) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "courier_id",
        "on_time",
        "off_time",
        "fulfilled_orders",
        "earnings",
        "utilization_time",
        "accepted_notifications",
        "guaranteed_compensation",
        "courier_utilization",
        "courier_delivery_earnings",
        "courier_compensation",
        "courier_orders_delivered_per_hour",
        "courier_bundles_picked_per_hour",
    ])?;
    for record in records {
        writer.write_record([
            record.courier_id.to_string(),
            record.on_time.to_string(),
            record.off_time.to_string(),
            record.fulfilled_orders.to_string(),
            optional_string(&record.earnings),
            record.utilization_time.to_string(),
            record.accepted_notifications.to_string(),
            optional_string(&record.guaranteed_compensation),
            record.courier_utilization.to_string(),
            record.courier_delivery_earnings.to_string(),
            optional_string(&record.courier_compensation),
            record.courier_orders_delivered_per_hour.to_string(),
            record.courier_bundles_picked_per_hour.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write order metrics as CSV, one row per finished order.
pub fn write_order_metrics_csv<P: AsRef<Path>>(
    path: P,
    records: &[OrderMetricsRecord],
) -> Result<(), Box<dyn Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "order_id",
        "placement_time",
        "preparation_time",
        "ready_time",
        "expected_drop_off_time",
        "acceptance_time",
        "in_store_time",
        "pick_up_time",
        "drop_off_time",
        "cancellation_time",
        "state",
        "click_to_door",
        "click_to_taken",
        "ready_to_pick_up",
    ])?;
    for record in records {
        writer.write_record([
            record.order_id.to_string(),
            record.placement_time.to_string(),
            record.preparation_time.to_string(),
            record.ready_time.to_string(),
            record.expected_drop_off_time.to_string(),
            optional_string(&record.acceptance_time),
            optional_string(&record.in_store_time),
            optional_string(&record.pick_up_time),
            optional_string(&record.drop_off_time),
            optional_string(&record.cancellation_time),
            record.state.to_string(),
            optional_string(&record.click_to_door),
            optional_string(&record.click_to_taken),
            optional_string(&record.ready_to_pick_up),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write courier metrics as a single Parquet record batch.
pub fn write_courier_metrics_parquet<P: AsRef<Path>>(
    path: P,
    records: &[CourierMetricsRecord],
) -> Result<(), Box<dyn Error>> {
    let schema = Schema::new(vec![
        u64_field("courier_id"),
        u64_field("on_time"),
        u64_field("off_time"),
        u64_field("fulfilled_orders"),
        nullable_f64_field("earnings"),
        u64_field("utilization_time"),
        Field::new("accepted_notifications", DataType::UInt32, false),
        Field::new("guaranteed_compensation", DataType::Boolean, true),
        f64_field("courier_utilization"),
        f64_field("courier_delivery_earnings"),
        nullable_f64_field("courier_compensation"),
        f64_field("courier_orders_delivered_per_hour"),
        f64_field("courier_bundles_picked_per_hour"),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.courier_id),
        )),
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.on_time),
        )),
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.off_time),
        )),
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.fulfilled_orders as u64),
        )),
        Arc::new(Float64Array::from(
            records.iter().map(|r| r.earnings).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.utilization_time),
        )),
        Arc::new(UInt32Array::from_iter_values(
            records.iter().map(|r| r.accepted_notifications),
        )),
        Arc::new(BooleanArray::from(
            records
                .iter()
                .map(|r| r.guaranteed_compensation)
                .collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.courier_utilization),
        )),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.courier_delivery_earnings),
        )),
        Arc::new(Float64Array::from(
            records
                .iter()
                .map(|r| r.courier_compensation)
                .collect::<Vec<_>>(),
        )),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.courier_orders_delivered_per_hour),
        )),
        Arc::new(Float64Array::from_iter_values(
            records.iter().map(|r| r.courier_bundles_picked_per_hour),
        )),
    ];

    write_record_batch(path, schema, arrays)
}

/// Write order metrics as a single Parquet record batch. The order state is
/// carried as its lifecycle string.
pub fn write_order_metrics_parquet<P: AsRef<Path>>(
    path: P,
    records: &[OrderMetricsRecord],
) -> Result<(), Box<dyn Error>> {
    use arrow::array::StringArray;

    let schema = Schema::new(vec![
        u64_field("order_id"),
        u64_field("placement_time"),
        u64_field("preparation_time"),
        u64_field("ready_time"),
        u64_field("expected_drop_off_time"),
        nullable_u64_field("acceptance_time"),
        nullable_u64_field("in_store_time"),
        nullable_u64_field("pick_up_time"),
        nullable_u64_field("drop_off_time"),
        nullable_u64_field("cancellation_time"),
        Field::new("state", DataType::Utf8, false),
        nullable_u64_field("click_to_door"),
        nullable_u64_field("click_to_taken"),
        nullable_u64_field("ready_to_pick_up"),
    ]);

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.order_id),
        )),
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.placement_time),
        )),
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.preparation_time),
        )),
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.ready_time),
        )),
        Arc::new(UInt64Array::from_iter_values(
            records.iter().map(|r| r.expected_drop_off_time),
        )),
        Arc::new(UInt64Array::from(
            records.iter().map(|r| r.acceptance_time).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            records.iter().map(|r| r.in_store_time).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            records.iter().map(|r| r.pick_up_time).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            records.iter().map(|r| r.drop_off_time).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            records
                .iter()
                .map(|r| r.cancellation_time)
                .collect::<Vec<_>>(),
        )),
        Arc::new(StringArray::from(
            records.iter().map(|r| r.state).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            records.iter().map(|r| r.click_to_door).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            records.iter().map(|r| r.click_to_taken).collect::<Vec<_>>(),
        )),
        Arc::new(UInt64Array::from(
            records
                .iter()
                .map(|r| r.ready_to_pick_up)
                .collect::<Vec<_>>(),
        )),
    ];

    write_record_batch(path, schema, arrays)
}

/// Dump the whole report as pretty-printed JSON.
pub fn write_report_json<P: AsRef<Path>>(
    path: P,
    report: &SimulationReport,
) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, report)?;
    Ok(())
}
