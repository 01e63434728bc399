use super::notify::{LogNotifier, Notification, Notifier};
use super::policy::{Operation, WriteDisposition, WritePolicy};
use super::sql_builder::build_select_all_sql;
use crate::error::{Result, TableIoError};
use crate::frame::Dataframe;
use crate::table::TableAddress;
use crate::warehouse::{Connector, Warehouse};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum Request {
    Read,
    Write {
        payload: Dataframe,
        policy: WritePolicy,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteReport {
    pub address: TableAddress,
    pub disposition: WriteDisposition,
    pub rows_written: usize,
    pub jobs: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Read(Dataframe),
    Written(WriteReport),
}

impl Outcome {
    pub fn into_frame(self) -> Option<Dataframe> {
        match self {
            Outcome::Read(frame) => Some(frame),
            Outcome::Written(_) => None,
        }
    }
}

/// Reads whole tables into dataframes and writes dataframes back.
///
/// A fresh warehouse session is opened for every call.
pub struct TableIo<C: Connector> {
    connector: C,
    notifier: Arc<dyn Notifier>,
}

impl<C: Connector> TableIo<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    pub async fn execute(&self, address: &TableAddress, request: Request) -> Result<Outcome> {
        match request {
            Request::Read => self.read(address).await.map(Outcome::Read),
            Request::Write { payload, policy } => self
                .write(address, &payload, policy)
                .await
                .map(Outcome::Written),
        }
    }

    pub async fn read(&self, address: &TableAddress) -> Result<Dataframe> {
        let sql = build_select_all_sql(address);
        debug!(table = %address, sql = %sql, "Reading table");

        let warehouse = self.connector.connect(address.project()).await?;
        let frame = warehouse.query(&sql).await?;

        info!(
            table = %address,
            rows = frame.num_rows(),
            columns = frame.num_columns(),
            "Read table"
        );
        Ok(frame)
    }

    pub async fn write(
        &self,
        address: &TableAddress,
        payload: &Dataframe,
        policy: WritePolicy,
    ) -> Result<WriteReport> {
        let disposition = WriteDisposition::from(policy);
        debug!(
            table = %address,
            policy = %policy,
            disposition = %disposition,
            rows = payload.num_rows(),
            "Writing table"
        );

        let warehouse = self.connector.connect(address.project()).await?;
        let stats = warehouse.load(payload, address, disposition).await?;

        self.notifier.notify(&Notification::Written {
            address: address.clone(),
            rows: stats.rows,
        });

        Ok(WriteReport {
            address: address.clone(),
            disposition,
            rows_written: stats.rows,
            jobs: stats.jobs,
        })
    }

    /// String-typed entry point with a distinguishable result.
    ///
    /// Every argument is validated before the warehouse is contacted.
    pub async fn try_run(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
        operation: &str,
        payload: Option<Dataframe>,
        policy: &str,
    ) -> Result<Outcome> {
        let operation: Operation = operation.parse()?;
        let address = TableAddress::new(project, dataset, table)?;

        let request = match operation {
            Operation::Read => Request::Read,
            Operation::Write => {
                let payload = payload.ok_or(TableIoError::MissingPayload)?;
                let policy: WritePolicy = policy.parse()?;
                Request::Write { payload, policy }
            }
        };

        self.execute(&address, request).await
    }

    /// Like [`TableIo::try_run`], but every failure is reported through the notifier
    /// and collapsed to `None`. A successful write also yields `None`.
    pub async fn run(
        &self,
        project: &str,
        dataset: &str,
        table: &str,
        operation: &str,
        payload: Option<Dataframe>,
        policy: &str,
    ) -> Option<Dataframe> {
        match self
            .try_run(project, dataset, table, operation, payload, policy)
            .await
        {
            Ok(outcome) => outcome.into_frame(),
            Err(e) => {
                self.notifier.notify(&Notification::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                });
                None
            }
        }
    }
}
