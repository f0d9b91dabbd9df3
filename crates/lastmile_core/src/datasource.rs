//! Instance data sources: scheduled order placements and courier shifts.
//!
//! The world queries the data source once per simulated second. A read
//! failure is logged by the caller and treated as "no new entities this
//! tick"; it never stops the simulation.

use std::collections::BTreeMap;
use std::path::Path;

use bevy_ecs::prelude::Resource;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("data source I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("data source parse failure: {0}")]
    Csv(#[from] csv::Error),
}

/// One scheduled order placement. Times are simulated seconds since midnight.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderRow {
    pub order_id: u64,
    pub pick_up_lat: f64,
    pub pick_up_lng: f64,
    pub drop_off_lat: f64,
    pub drop_off_lng: f64,
    /// Alternate pick-up used by the demand-management substitution rule.
    pub pick_up_lat2: f64,
    pub pick_up_lng2: f64,
    pub placement_time: u64,
    pub expected_drop_off_time: u64,
    pub preparation_time: u64,
    pub ready_time: u64,
}

/// One courier shift.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourierRow {
    pub courier_id: u64,
    pub vehicle: String,
    pub on_lat: f64,
    pub on_lng: f64,
    pub on_time: u64,
    pub off_time: u64,
}

/// Tabular store of scheduled activations, queried per virtual second.
pub trait InstanceDataSource: Send + Sync {
    fn orders_placed_at(&self, placement_time: u64) -> Result<Vec<OrderRow>, DataSourceError>;
    fn couriers_on_at(&self, on_time: u64) -> Result<Vec<CourierRow>, DataSourceError>;
}

/// ECS resource wrapping a boxed data source.
#[derive(Resource)]
pub struct DataSourceResource(pub Box<dyn InstanceDataSource>);

/// In-memory data source for scenario construction and tests.
#[derive(Debug, Default)]
pub struct InMemoryDataSource {
    orders: BTreeMap<u64, Vec<OrderRow>>,
    couriers: BTreeMap<u64, Vec<CourierRow>>,
}

impl InMemoryDataSource {
    pub fn from_rows(orders: Vec<OrderRow>, couriers: Vec<CourierRow>) -> Self {
        let mut source = Self::default();
        for row in orders {
            source.orders.entry(row.placement_time).or_default().push(row);
        }
        for row in couriers {
            source.couriers.entry(row.on_time).or_default().push(row);
        }
        source
    }
}

impl InstanceDataSource for InMemoryDataSource {
    fn orders_placed_at(&self, placement_time: u64) -> Result<Vec<OrderRow>, DataSourceError> {
        Ok(self.orders.get(&placement_time).cloned().unwrap_or_default())
    }

    fn couriers_on_at(&self, on_time: u64) -> Result<Vec<CourierRow>, DataSourceError> {
        Ok(self.couriers.get(&on_time).cloned().unwrap_or_default())
    }
}

/// CSV-backed data source: one file of order rows, one of courier rows,
/// loaded eagerly and served per second.
pub struct CsvDataSource {
    inner: InMemoryDataSource,
}

impl CsvDataSource {
    pub fn from_paths<P: AsRef<Path>>(orders_path: P, couriers_path: P) -> Result<Self, DataSourceError> {
        let mut orders = Vec::new();
        let mut reader = csv::Reader::from_path(orders_path)?;
        for row in reader.deserialize() {
            orders.push(row?);
        }

        let mut couriers = Vec::new();
        let mut reader = csv::Reader::from_path(couriers_path)?;
        for row in reader.deserialize() {
            couriers.push(row?);
        }

        Ok(Self {
            inner: InMemoryDataSource::from_rows(orders, couriers),
        })
    }
}

impl InstanceDataSource for CsvDataSource {
    fn orders_placed_at(&self, placement_time: u64) -> Result<Vec<OrderRow>, DataSourceError> {
        self.inner.orders_placed_at(placement_time)
    }

    fn couriers_on_at(&self, on_time: u64) -> Result<Vec<CourierRow>, DataSourceError> {
        self.inner.couriers_on_at(on_time)
    }
}
