use super::{Connector, LoadStats, Warehouse};
use crate::error::{Result, TableIoError};
use crate::executor::WriteDisposition;
use crate::frame::Dataframe;
use crate::table::TableAddress;
use async_trait::async_trait;
use sqlparser::ast::{SelectItem, SetExpr, Statement, TableFactor};
use sqlparser::dialect::BigQueryDialect;
use sqlparser::parser::Parser;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct State {
    tables: Mutex<HashMap<TableAddress, Dataframe>>,
    connections: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

/// In-process warehouse honouring the same write dispositions as BigQuery.
///
/// Clones share their tables, so a connector and the sessions it hands out
/// observe each other's writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    state: Arc<State>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, address: TableAddress, frame: Dataframe) -> Self {
        self.tables().insert(address, frame);
        self
    }

    pub fn table(&self, address: &TableAddress) -> Option<Dataframe> {
        self.tables().get(address).cloned()
    }

    /// Number of sessions opened through [`Connector::connect`].
    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.state
            .queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    fn tables(&self) -> MutexGuard<'_, HashMap<TableAddress, Dataframe>> {
        self.state
            .tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_query(&self, sql: &str) {
        if let Ok(mut queries) = self.state.queries.lock() {
            queries.push(sql.to_string());
        }
    }
}

/// Extracts the table of a plain `SELECT * FROM <table>` statement.
fn parse_select_all(sql: &str) -> Result<TableAddress> {
    let unsupported = || TableIoError::Warehouse(format!("Unsupported query: {}", sql));

    let statements = Parser::parse_sql(&BigQueryDialect {}, sql)
        .map_err(|e| TableIoError::Warehouse(format!("Syntax error: {}", e)))?;

    let [Statement::Query(query)] = statements.as_slice() else {
        return Err(unsupported());
    };
    let SetExpr::Select(select) = query.body.as_ref() else {
        return Err(unsupported());
    };
    if !matches!(select.projection.as_slice(), [SelectItem::Wildcard(_)])
        || select.selection.is_some()
    {
        return Err(unsupported());
    }
    let [from] = select.from.as_slice() else {
        return Err(unsupported());
    };
    if !from.joins.is_empty() {
        return Err(unsupported());
    }
    let TableFactor::Table { name, .. } = &from.relation else {
        return Err(unsupported());
    };

    // A backticked `p.d.t` may come back as one identifier or three.
    let joined = name
        .0
        .iter()
        .map(|ident| ident.value.as_str())
        .collect::<Vec<_>>()
        .join(".");
    TableAddress::parse(&joined)
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn query(&self, sql: &str) -> Result<Dataframe> {
        self.record_query(sql);
        let address = parse_select_all(sql)?;
        debug!(table = %address, "Serving query from memory");

        self.table(&address).ok_or_else(|| {
            TableIoError::Warehouse(format!(
                "Not found: Table {}:{}.{}",
                address.project(),
                address.dataset(),
                address.table()
            ))
        })
    }

    async fn load(
        &self,
        payload: &Dataframe,
        target: &TableAddress,
        disposition: WriteDisposition,
    ) -> Result<LoadStats> {
        if payload.num_columns() == 0 {
            return Err(TableIoError::InvalidFrame(
                "cannot write a dataframe without columns".to_string(),
            ));
        }

        let mut tables = self.tables();
        let existing = tables.get(target);

        let next = match (disposition, existing) {
            (WriteDisposition::WriteEmpty, Some(current)) if !current.is_empty() => {
                return Err(TableIoError::JobFailed {
                    job_id: "memory".to_string(),
                    message: format!("Already Exists: Table {}", target),
                });
            }
            (WriteDisposition::WriteAppend, Some(current)) => current
                .append(payload)
                .map_err(|e| TableIoError::JobFailed {
                    job_id: "memory".to_string(),
                    message: e.to_string(),
                })?,
            _ => payload.clone(),
        };

        tables.insert(target.clone(), next);
        Ok(LoadStats {
            rows: payload.num_rows(),
            jobs: 1,
        })
    }
}

#[async_trait]
impl Connector for MemoryWarehouse {
    type Handle = MemoryWarehouse;

    async fn connect(&self, project: &str) -> Result<MemoryWarehouse> {
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        debug!(project = %project, "Opened in-memory session");
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Column, Value};
    use crate::schema::BqType;

    fn addr() -> TableAddress {
        TableAddress::new("p", "d", "t").unwrap()
    }

    fn ids(values: &[i64]) -> Dataframe {
        Dataframe::new(vec![Column::new(
            "id",
            BqType::Int64,
            values.iter().copied().map(Value::Int64).collect(),
        )])
        .unwrap()
    }

    #[test]
    fn test_parse_select_all() {
        assert_eq!(parse_select_all("SELECT * FROM `p.d.t`").unwrap(), addr());
        assert_eq!(parse_select_all("select * from p.d.t").unwrap(), addr());
    }

    #[test]
    fn test_parse_rejects_other_queries() {
        assert!(parse_select_all("SELECT id FROM `p.d.t`").is_err());
        assert!(parse_select_all("SELECT * FROM `p.d.t` WHERE id = 1").is_err());
        assert!(parse_select_all("DELETE FROM `p.d.t` WHERE TRUE").is_err());
        assert!(parse_select_all("SELEC * FROM").is_err());
    }

    #[tokio::test]
    async fn test_query_missing_table() {
        let warehouse = MemoryWarehouse::new();
        let err = warehouse.query("SELECT * FROM `p.d.t`").await.unwrap_err();
        assert_eq!(err.to_string(), "Warehouse error: Not found: Table p:d.t");
    }

    #[tokio::test]
    async fn test_load_dispositions() {
        let warehouse = MemoryWarehouse::new();

        warehouse
            .load(&ids(&[1, 2]), &addr(), WriteDisposition::WriteEmpty)
            .await
            .unwrap();
        warehouse
            .load(&ids(&[3]), &addr(), WriteDisposition::WriteAppend)
            .await
            .unwrap();
        assert_eq!(warehouse.table(&addr()).unwrap().num_rows(), 3);

        let err = warehouse
            .load(&ids(&[4]), &addr(), WriteDisposition::WriteEmpty)
            .await
            .unwrap_err();
        assert!(matches!(err, TableIoError::JobFailed { .. }));
        assert_eq!(warehouse.table(&addr()).unwrap().num_rows(), 3);

        warehouse
            .load(&ids(&[9]), &addr(), WriteDisposition::WriteTruncate)
            .await
            .unwrap();
        assert_eq!(warehouse.table(&addr()).unwrap(), ids(&[9]));
    }

    #[tokio::test]
    async fn test_write_empty_allows_empty_existing_table() {
        let warehouse = MemoryWarehouse::new().with_table(addr(), ids(&[]));
        warehouse
            .load(&ids(&[1]), &addr(), WriteDisposition::WriteEmpty)
            .await
            .unwrap();
        assert_eq!(warehouse.table(&addr()).unwrap().num_rows(), 1);
    }

    #[tokio::test]
    async fn test_append_schema_mismatch_fails() {
        let warehouse = MemoryWarehouse::new().with_table(addr(), ids(&[1]));
        let other = Dataframe::new(vec![Column::new("name", BqType::String, vec![])]).unwrap();
        assert!(warehouse
            .load(&other, &addr(), WriteDisposition::WriteAppend)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_connect_counts_sessions() {
        let warehouse = MemoryWarehouse::new();
        let session = warehouse.connect("p").await.unwrap();
        session
            .load(&ids(&[1]), &addr(), WriteDisposition::WriteTruncate)
            .await
            .unwrap();
        assert_eq!(warehouse.connections(), 1);
        assert!(warehouse.table(&addr()).is_some());
    }
}
