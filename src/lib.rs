pub mod config;
pub mod error;
pub mod executor;
pub mod frame;
pub mod schema;
pub mod table;
pub mod warehouse;

pub use config::Config;
pub use error::{ErrorKind, Result, TableIoError};
pub use executor::{
    LogNotifier, Notification, Notifier, Operation, Outcome, RecordingNotifier, Request, TableIo,
    WriteDisposition, WritePolicy, WriteReport,
};
pub use frame::{Column, ColumnInfo, Dataframe, FrameInfo, Row, Value};
pub use schema::BqType;
pub use table::TableAddress;
pub use warehouse::{BigQueryConnector, BqClient, Connector, LoadStats, MemoryWarehouse, Warehouse};
