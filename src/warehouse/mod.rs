mod client;
mod memory;

pub use client::{BigQueryConnector, BqClient};
pub use memory::MemoryWarehouse;

use crate::error::Result;
use crate::executor::WriteDisposition;
use crate::frame::Dataframe;
use crate::table::TableAddress;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub rows: usize,
    pub jobs: usize,
}

/// An authenticated session against one project of the warehouse.
///
/// Both calls return only once the underlying job has reached a terminal state.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Runs `sql` and materializes the complete result set.
    async fn query(&self, sql: &str) -> Result<Dataframe>;

    async fn load(
        &self,
        payload: &Dataframe,
        target: &TableAddress,
        disposition: WriteDisposition,
    ) -> Result<LoadStats>;
}

/// Opens warehouse sessions. Called once per operation.
#[async_trait]
pub trait Connector: Send + Sync {
    type Handle: Warehouse;

    async fn connect(&self, project: &str) -> Result<Self::Handle>;
}
