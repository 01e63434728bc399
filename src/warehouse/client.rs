use super::{Connector, LoadStats, Warehouse};
use crate::config::Config;
use crate::error::{Result, TableIoError};
use crate::executor::sql_builder::{build_load_statements, build_select_all_sql};
use crate::executor::WriteDisposition;
use crate::frame::{Column, Dataframe, Value};
use crate::schema::BqType;
use crate::table::TableAddress;
use async_trait::async_trait;
use gcp_bigquery_client::model::get_query_results_parameters::GetQueryResultsParameters;
use gcp_bigquery_client::model::job::Job;
use gcp_bigquery_client::model::query_request::QueryRequest;
use gcp_bigquery_client::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

const JOB_STATE_DONE: &str = "DONE";

// Responses are read through their REST JSON shape.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobRef {
    job_id: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SchemaJson {
    fields: Option<Vec<FieldJson>>,
}

#[derive(Debug, Deserialize)]
struct FieldJson {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    mode: Option<String>,
    fields: Option<Vec<FieldJson>>,
}

impl FieldJson {
    fn is_repeated(&self) -> bool {
        self.mode.as_deref() == Some("REPEATED")
    }
}

#[derive(Debug, Deserialize)]
struct RowJson {
    f: Option<Vec<CellJson>>,
}

#[derive(Debug, Deserialize)]
struct CellJson {
    v: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultPage {
    job_complete: Option<bool>,
    job_reference: Option<JobRef>,
    page_token: Option<String>,
    schema: Option<SchemaJson>,
    rows: Option<Vec<RowJson>>,
}

impl ResultPage {
    fn is_complete(&self) -> bool {
        self.job_complete.unwrap_or(false)
    }
}

/// What to ask BigQuery for after a result page.
#[derive(Debug, PartialEq)]
enum PageStep {
    Done,
    Poll,
    NextPage(String),
}

/// Accumulates result pages until the whole table is materialized.
#[derive(Debug, Default)]
struct PageCollector {
    schema: Option<SchemaJson>,
    rows: Vec<RowJson>,
}

impl PageCollector {
    fn absorb(&mut self, mut page: ResultPage) -> PageStep {
        if !page.is_complete() {
            return PageStep::Poll;
        }
        if self.schema.is_none() {
            self.schema = page.schema.take();
        }
        self.rows.extend(page.rows.take().unwrap_or_default());
        match page.page_token.take() {
            Some(token) => PageStep::NextPage(token),
            None => PageStep::Done,
        }
    }

    fn finish(self) -> Result<Dataframe> {
        let fields = self.schema.and_then(|s| s.fields).unwrap_or_default();
        decode_frame(&fields, self.rows)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorJson {
    message: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatusJson {
    state: Option<String>,
    error_result: Option<ErrorJson>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobJson {
    job_reference: Option<JobRef>,
    status: Option<JobStatusJson>,
}

/// `None` while the job is still pending or running.
fn job_outcome(job_id: &str, status: Option<JobStatusJson>) -> Option<Result<()>> {
    let status = status?;
    if status.state.as_deref() != Some(JOB_STATE_DONE) {
        return None;
    }
    Some(match status.error_result {
        Some(error) => Err(TableIoError::JobFailed {
            job_id: job_id.to_string(),
            message: error
                .message
                .or(error.reason)
                .unwrap_or_else(|| "unknown error".to_string()),
        }),
        None => Ok(()),
    })
}

fn reshape<T: Serialize, U: DeserializeOwned>(value: &T) -> Result<U> {
    serde_json::to_value(value)
        .and_then(serde_json::from_value)
        .map_err(|e| TableIoError::Conversion(format!("unexpected BigQuery response: {}", e)))
}

/// Repeated fields arrive as JSON arrays and are kept as JSON text.
fn column_type(field: &FieldJson) -> BqType {
    if field.is_repeated() {
        return BqType::Json;
    }
    field.field_type.parse().unwrap_or_else(|_| {
        warn!(column = %field.name, field_type = %field.field_type, "Unknown column type, reading as STRING");
        BqType::String
    })
}

/// Strips the `{"v": ..}` and `{"f": [..]}` wire wrappers from a nested cell,
/// naming record members after their sub-fields.
fn plain_json(value: JsonValue, field: &FieldJson, element: bool) -> JsonValue {
    if field.is_repeated() && !element {
        return match value {
            JsonValue::Array(items) => JsonValue::Array(
                items
                    .into_iter()
                    .map(|item| plain_json(unwrap_v(item), field, true))
                    .collect(),
            ),
            other => other,
        };
    }

    match (value, field.fields.as_deref()) {
        (JsonValue::Object(mut record), Some(members)) => {
            let cells = match record.remove("f") {
                Some(JsonValue::Array(cells)) => cells,
                _ => return JsonValue::Object(record),
            };
            let object = members
                .iter()
                .zip(cells)
                .map(|(member, cell)| {
                    (member.name.clone(), plain_json(unwrap_v(cell), member, false))
                })
                .collect();
            JsonValue::Object(object)
        }
        (JsonValue::String(text), _) => scalar_json(text, &field.field_type),
        (other, _) => other,
    }
}

fn unwrap_v(cell: JsonValue) -> JsonValue {
    match cell {
        JsonValue::Object(mut wrapper) if wrapper.contains_key("v") => {
            wrapper.remove("v").unwrap_or(JsonValue::Null)
        }
        other => other,
    }
}

fn scalar_json(text: String, field_type: &str) -> JsonValue {
    match field_type.parse::<BqType>() {
        Ok(BqType::Int64) => text
            .parse::<i64>()
            .map(JsonValue::from)
            .unwrap_or(JsonValue::String(text)),
        Ok(BqType::Float64) => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::String(text)),
        Ok(BqType::Bool) => match text.as_str() {
            "true" => JsonValue::Bool(true),
            "false" => JsonValue::Bool(false),
            _ => JsonValue::String(text),
        },
        _ => JsonValue::String(text),
    }
}

fn decode_cell(cell: Option<JsonValue>, field: &FieldJson, dtype: BqType) -> Result<Value> {
    match cell {
        None | Some(JsonValue::Null) => Ok(Value::Null),
        Some(nested) if matches!(dtype, BqType::Struct | BqType::Json) && !nested.is_string() => {
            Ok(Value::String(plain_json(nested, field, false).to_string()))
        }
        Some(JsonValue::String(s)) => Value::parse(&s, dtype).map_err(TableIoError::Conversion),
        Some(other) => Value::parse(&other.to_string(), dtype).map_err(TableIoError::Conversion),
    }
}

fn decode_frame(fields: &[FieldJson], rows: Vec<RowJson>) -> Result<Dataframe> {
    let dtypes: Vec<BqType> = fields.iter().map(column_type).collect();
    let mut values: Vec<Vec<Value>> = fields
        .iter()
        .map(|_| Vec::with_capacity(rows.len()))
        .collect();

    for (index, row) in rows.into_iter().enumerate() {
        let cells = row.f.unwrap_or_default();
        if cells.len() != fields.len() {
            return Err(TableIoError::Conversion(format!(
                "row {} has {} cells but the schema has {} fields",
                index,
                cells.len(),
                fields.len()
            )));
        }
        for (i, cell) in cells.into_iter().enumerate() {
            values[i].push(decode_cell(cell.v, &fields[i], dtypes[i])?);
        }
    }

    let columns = fields
        .iter()
        .zip(dtypes)
        .zip(values)
        .map(|((field, dtype), values)| Column::new(field.name.clone(), dtype, values))
        .collect();

    Dataframe::new(columns)
}

#[derive(Debug, Clone, PartialEq)]
struct LoadStep {
    sql: String,
    destination: TableAddress,
    disposition: WriteDisposition,
}

/// Jobs that carry a payload into `target`.
///
/// A single statement goes straight to the target. Several statements are appended to
/// `staging` first, then copied into the target by one job with the requested
/// disposition, so the target only ever sees the complete payload.
#[derive(Debug, PartialEq)]
enum LoadPlan {
    Direct(LoadStep),
    Staged {
        staging: TableAddress,
        chunks: Vec<LoadStep>,
        commit: LoadStep,
    },
}

impl LoadPlan {
    fn new(
        mut statements: Vec<String>,
        target: &TableAddress,
        disposition: WriteDisposition,
        staging: TableAddress,
    ) -> Self {
        if statements.len() == 1 {
            if let Some(sql) = statements.pop() {
                return LoadPlan::Direct(LoadStep {
                    sql,
                    destination: target.clone(),
                    disposition,
                });
            }
        }

        let chunks = statements
            .into_iter()
            .map(|sql| LoadStep {
                sql,
                destination: staging.clone(),
                disposition: WriteDisposition::WriteAppend,
            })
            .collect();
        let commit = LoadStep {
            sql: build_select_all_sql(&staging),
            destination: target.clone(),
            disposition,
        };
        LoadPlan::Staged {
            staging,
            chunks,
            commit,
        }
    }

    fn jobs(&self) -> usize {
        match self {
            LoadPlan::Direct(_) => 1,
            LoadPlan::Staged { chunks, .. } => chunks.len() + 1,
        }
    }
}

fn staging_address(target: &TableAddress) -> Result<TableAddress> {
    target.sibling(format!("{}_bqio_{}", target.table(), Uuid::new_v4().simple()))
}

fn load_job_resource(
    project_id: &str,
    job_id: &str,
    target: &TableAddress,
    disposition: WriteDisposition,
    sql: String,
) -> JsonValue {
    json!({
        "jobReference": {
            "projectId": project_id,
            "jobId": job_id,
        },
        "configuration": {
            "query": {
                "query": sql,
                "useLegacySql": false,
                "destinationTable": {
                    "projectId": target.project(),
                    "datasetId": target.dataset(),
                    "tableId": target.table(),
                },
                "writeDisposition": disposition.as_str(),
                "createDisposition": "CREATE_IF_NEEDED",
            }
        }
    })
}

/// BigQuery session bound to one billing project.
pub struct BqClient {
    client: Client,
    project_id: String,
    poll_interval: Duration,
    max_statement_bytes: usize,
}

impl BqClient {
    pub async fn connect(project_id: impl Into<String>, config: &Config) -> Result<Self> {
        let project_id = project_id.into();
        let client = match &config.key_file {
            Some(path) => {
                debug!(project = %project_id, key_file = %path.display(), "Authenticating with service account key");
                Client::from_service_account_key_file(&path.to_string_lossy()).await?
            }
            None => {
                debug!(project = %project_id, "Authenticating with application default credentials");
                Client::from_application_default_credentials().await?
            }
        };

        Ok(Self {
            client,
            project_id,
            poll_interval: config.poll_interval,
            max_statement_bytes: config.max_statement_bytes,
        })
    }

    async fn fetch_all(&self, sql: &str) -> Result<Dataframe> {
        let response = self
            .client
            .job()
            .query(&self.project_id, QueryRequest::new(sql.to_string()))
            .await?;
        let page: ResultPage = reshape(&response)?;
        let reference = page.job_reference.clone().unwrap_or_default();
        let mut collector = PageCollector::default();
        let mut step = collector.absorb(page);

        while step != PageStep::Done {
            let job_id = reference.job_id.as_deref().ok_or_else(|| {
                TableIoError::Warehouse("query response carried no job id".to_string())
            })?;

            let page_token = match step {
                PageStep::NextPage(token) => Some(token),
                _ => {
                    debug!(job_id = %job_id, "Waiting for query job");
                    sleep(self.poll_interval).await;
                    None
                }
            };
            let parameters = GetQueryResultsParameters {
                page_token,
                location: reference.location.clone(),
                ..Default::default()
            };
            let response = self
                .client
                .job()
                .get_query_results(&self.project_id, job_id, parameters)
                .await?;
            step = collector.absorb(reshape(&response)?);
        }

        collector.finish()
    }

    async fn wait_for_job(&self, job_id: &str, job: Job) -> Result<()> {
        let mut current: JobJson = reshape(&job)?;
        let location = current
            .job_reference
            .as_ref()
            .and_then(|r| r.location.clone());

        loop {
            if let Some(outcome) = job_outcome(job_id, current.status.take()) {
                return outcome;
            }

            debug!(job_id = %job_id, "Waiting for load job");
            sleep(self.poll_interval).await;
            let job = self
                .client
                .job()
                .get_job(&self.project_id, job_id, location.as_deref())
                .await?;
            current = reshape(&job)?;
        }
    }

    async fn run_step(&self, step: LoadStep) -> Result<()> {
        let job_id = format!("bqio_load_{}", Uuid::new_v4().simple());
        debug!(
            job_id = %job_id,
            table = %step.destination,
            disposition = %step.disposition,
            "Submitting load job"
        );
        let resource = load_job_resource(
            &self.project_id,
            &job_id,
            &step.destination,
            step.disposition,
            step.sql,
        );
        let job: Job = serde_json::from_value(resource)
            .map_err(|e| TableIoError::Conversion(format!("invalid job resource: {}", e)))?;
        let inserted = self.client.job().insert(&self.project_id, job).await?;
        self.wait_for_job(&job_id, inserted).await
    }

    async fn run_staged(&self, chunks: Vec<LoadStep>, commit: LoadStep) -> Result<()> {
        let total = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            debug!(chunk = i + 1, chunks = total, "Staging chunk");
            self.run_step(chunk).await?;
        }
        self.run_step(commit).await
    }

    async fn drop_table(&self, table: &TableAddress) {
        let sql = format!("DROP TABLE IF EXISTS {}", table.quoted());
        let request = QueryRequest::new(sql);
        if let Err(e) = self.client.job().query(&self.project_id, request).await {
            warn!(table = %table, error = %e, "Failed to drop staging table");
        }
    }

    async fn load_frame(
        &self,
        payload: &Dataframe,
        target: &TableAddress,
        disposition: WriteDisposition,
    ) -> Result<LoadStats> {
        let statements = build_load_statements(payload, self.max_statement_bytes)?;
        let plan = LoadPlan::new(statements, target, disposition, staging_address(target)?);
        let jobs = plan.jobs();

        match plan {
            LoadPlan::Direct(step) => self.run_step(step).await?,
            LoadPlan::Staged {
                staging,
                chunks,
                commit,
            } => {
                debug!(table = %target, staging = %staging, chunks = chunks.len(), "Staging payload");
                let result = self.run_staged(chunks, commit).await;
                self.drop_table(&staging).await;
                result?
            }
        }

        info!(table = %target, rows = payload.num_rows(), jobs, "Load complete");
        Ok(LoadStats {
            rows: payload.num_rows(),
            jobs,
        })
    }
}

impl fmt::Debug for BqClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BqClient")
            .field("project_id", &self.project_id)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[async_trait]
impl Warehouse for BqClient {
    async fn query(&self, sql: &str) -> Result<Dataframe> {
        self.fetch_all(sql).await
    }

    async fn load(
        &self,
        payload: &Dataframe,
        target: &TableAddress,
        disposition: WriteDisposition,
    ) -> Result<LoadStats> {
        self.load_frame(payload, target, disposition).await
    }
}

/// Opens a [`BqClient`] per operation using the configured credentials.
#[derive(Debug, Clone, Default)]
pub struct BigQueryConnector {
    config: Config,
}

impl BigQueryConnector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for BigQueryConnector {
    type Handle = BqClient;

    async fn connect(&self, project: &str) -> Result<BqClient> {
        BqClient::connect(project, &self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fields(value: JsonValue) -> Vec<FieldJson> {
        serde_json::from_value(value).unwrap()
    }

    fn rows(value: JsonValue) -> Vec<RowJson> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_frame_uses_schema_types() {
        let fields = fields(json!([
            {"name": "id", "type": "INTEGER", "mode": "NULLABLE"},
            {"name": "status", "type": "STRING"},
            {"name": "opened", "type": "DATE"},
        ]));
        let rows = rows(json!([
            {"f": [{"v": "1"}, {"v": "closed"}, {"v": "2024-01-05"}]},
            {"f": [{"v": "2"}, {"v": null}, {"v": null}]},
        ]));

        let df = decode_frame(&fields, rows).unwrap();
        assert_eq!(df.column_names(), vec!["id", "status", "opened"]);
        assert_eq!(df.num_rows(), 2);
        assert_eq!(df.column("id").unwrap().dtype(), BqType::Int64);
        assert_eq!(df.column("id").unwrap().values()[1], Value::Int64(2));
        assert_eq!(df.column("status").unwrap().values()[1], Value::Null);
        assert_eq!(
            df.column("opened").unwrap().values()[0],
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
    }

    #[test]
    fn test_decode_frame_repeated_and_record_fields_as_plain_json() {
        let fields = fields(json!([
            {"name": "tags", "type": "STRING", "mode": "REPEATED"},
            {"name": "meta", "type": "RECORD", "fields": [
                {"name": "n", "type": "INTEGER"},
                {"name": "ok", "type": "BOOLEAN"},
                {"name": "scores", "type": "FLOAT", "mode": "REPEATED"},
            ]},
        ]));
        let rows = rows(json!([
            {"f": [
                {"v": [{"v": "a"}, {"v": "b"}]},
                {"v": {"f": [{"v": "1"}, {"v": "true"}, {"v": [{"v": "0.5"}]}]}},
            ]},
        ]));

        let df = decode_frame(&fields, rows).unwrap();
        let tags = df.column("tags").unwrap();
        assert_eq!(tags.dtype(), BqType::Json);
        assert_eq!(tags.values()[0], Value::String(r#"["a","b"]"#.to_string()));

        let meta = df.column("meta").unwrap();
        assert_eq!(meta.dtype(), BqType::Struct);
        assert_eq!(
            meta.values()[0],
            Value::String(r#"{"n":1,"ok":true,"scores":[0.5]}"#.to_string())
        );
    }

    #[test]
    fn test_repeated_records_become_array_of_objects() {
        let fields = fields(json!([
            {"name": "events", "type": "RECORD", "mode": "REPEATED", "fields": [
                {"name": "kind", "type": "STRING"},
                {"name": "at", "type": "DATE"},
            ]},
        ]));
        let rows = rows(json!([
            {"f": [{"v": [{"v": {"f": [{"v": "open"}, {"v": null}]}}]}]},
        ]));

        let df = decode_frame(&fields, rows).unwrap();
        assert_eq!(
            df.column("events").unwrap().values()[0],
            Value::String(r#"[{"kind":"open","at":null}]"#.to_string())
        );
    }

    #[test]
    fn test_decode_frame_rejects_short_rows() {
        let fields = fields(json!([{"name": "a", "type": "STRING"}, {"name": "b", "type": "STRING"}]));
        let rows = rows(json!([{"f": [{"v": "x"}]}]));
        assert!(matches!(
            decode_frame(&fields, rows),
            Err(TableIoError::Conversion(_))
        ));
    }

    #[test]
    fn test_decode_frame_without_schema_is_empty() {
        let df = decode_frame(&[], Vec::new()).unwrap();
        assert_eq!(df.num_columns(), 0);
        assert!(df.is_empty());
    }

    #[test]
    fn test_unknown_type_reads_as_string() {
        let field: FieldJson =
            serde_json::from_value(json!({"name": "r", "type": "RANGE"})).unwrap();
        assert_eq!(column_type(&field), BqType::String);
    }

    #[test]
    fn test_result_page_shape() {
        let page: ResultPage = serde_json::from_value(json!({
            "jobComplete": false,
            "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
            "totalRows": "0"
        }))
        .unwrap();
        assert!(!page.is_complete());
        assert_eq!(
            page.job_reference.unwrap().job_id.as_deref(),
            Some("job_1")
        );
    }

    #[test]
    fn test_job_status_shape() {
        let job: JobJson = serde_json::from_value(json!({
            "status": {
                "state": "DONE",
                "errorResult": {"reason": "duplicate", "message": "Already Exists: Table p:d.t"}
            }
        }))
        .unwrap();
        let status = job.status.unwrap();
        assert_eq!(status.state.as_deref(), Some("DONE"));
        assert_eq!(
            status.error_result.unwrap().message.as_deref(),
            Some("Already Exists: Table p:d.t")
        );
    }

    #[test]
    fn test_load_job_resource() {
        let target = TableAddress::new("p", "d", "t").unwrap();
        let resource = load_job_resource(
            "p",
            "bqio_load_1",
            &target,
            WriteDisposition::WriteEmpty,
            "SELECT 1".to_string(),
        );
        let query = &resource["configuration"]["query"];
        assert_eq!(query["writeDisposition"], "WRITE_EMPTY");
        assert_eq!(query["createDisposition"], "CREATE_IF_NEEDED");
        assert_eq!(query["destinationTable"]["tableId"], "t");
        assert_eq!(query["useLegacySql"], false);
        assert_eq!(resource["jobReference"]["jobId"], "bqio_load_1");
    }

    fn page(value: JsonValue) -> ResultPage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_collector_polls_until_complete_then_follows_pages() {
        let schema = json!({"fields": [{"name": "id", "type": "INTEGER"}]});
        let mut collector = PageCollector::default();

        let first = collector.absorb(page(json!({
            "jobComplete": false,
            "jobReference": {"projectId": "p", "jobId": "job_1"}
        })));
        assert_eq!(first, PageStep::Poll);

        let second = collector.absorb(page(json!({
            "jobComplete": true,
            "schema": schema,
            "rows": [{"f": [{"v": "1"}]}, {"f": [{"v": "2"}]}],
            "pageToken": "page_2"
        })));
        assert_eq!(second, PageStep::NextPage("page_2".to_string()));

        let third = collector.absorb(page(json!({
            "jobComplete": true,
            "rows": [{"f": [{"v": "3"}]}]
        })));
        assert_eq!(third, PageStep::Done);

        let df = collector.finish().unwrap();
        let ids: Vec<i64> = df
            .column("id")
            .unwrap()
            .values()
            .iter()
            .filter_map(Value::as_i64)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_collector_single_complete_page() {
        let mut collector = PageCollector::default();
        let step = collector.absorb(page(json!({
            "jobComplete": true,
            "schema": {"fields": [{"name": "s", "type": "STRING"}]},
            "totalRows": "0"
        })));
        assert_eq!(step, PageStep::Done);

        let df = collector.finish().unwrap();
        assert_eq!(df.column_names(), vec!["s"]);
        assert!(df.is_empty());
    }

    fn status(value: JsonValue) -> Option<JobStatusJson> {
        Some(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_job_outcome_waits_until_done() {
        assert!(job_outcome("job_1", None).is_none());
        assert!(job_outcome("job_1", status(json!({"state": "PENDING"}))).is_none());
        assert!(job_outcome("job_1", status(json!({"state": "RUNNING"}))).is_none());
        assert!(matches!(
            job_outcome("job_1", status(json!({"state": "DONE"}))),
            Some(Ok(()))
        ));
    }

    #[test]
    fn test_job_outcome_done_with_error_result_fails() {
        let outcome = job_outcome(
            "job_1",
            status(json!({
                "state": "DONE",
                "errorResult": {"reason": "duplicate", "message": "Already Exists: Table p:d.t"}
            })),
        );
        match outcome {
            Some(Err(TableIoError::JobFailed { job_id, message })) => {
                assert_eq!(job_id, "job_1");
                assert_eq!(message, "Already Exists: Table p:d.t");
            }
            other => panic!("expected job failure, got {:?}", other),
        }

        let reason_only = job_outcome(
            "job_2",
            status(json!({"state": "DONE", "errorResult": {"reason": "quotaExceeded"}})),
        );
        assert!(matches!(
            reason_only,
            Some(Err(TableIoError::JobFailed { ref message, .. })) if message == "quotaExceeded"
        ));
    }

    fn target() -> TableAddress {
        TableAddress::new("p", "d", "t").unwrap()
    }

    #[test]
    fn test_single_statement_loads_target_directly() {
        let staging = target().sibling("t_bqio_1").unwrap();
        let plan = LoadPlan::new(
            vec!["SELECT 1".to_string()],
            &target(),
            WriteDisposition::WriteTruncate,
            staging,
        );

        assert_eq!(plan.jobs(), 1);
        assert_eq!(
            plan,
            LoadPlan::Direct(LoadStep {
                sql: "SELECT 1".to_string(),
                destination: target(),
                disposition: WriteDisposition::WriteTruncate,
            })
        );
    }

    #[test]
    fn test_chunked_load_commits_through_staging_in_one_job() {
        let staging = target().sibling("t_bqio_1").unwrap();
        let plan = LoadPlan::new(
            vec!["SELECT 1".to_string(), "SELECT 2".to_string(), "SELECT 3".to_string()],
            &target(),
            WriteDisposition::WriteEmpty,
            staging.clone(),
        );
        assert_eq!(plan.jobs(), 4);

        match plan {
            LoadPlan::Staged {
                staging: planned,
                chunks,
                commit,
            } => {
                assert_eq!(planned, staging);
                assert_eq!(chunks.len(), 3);
                assert!(chunks.iter().all(|c| c.destination == staging
                    && c.disposition == WriteDisposition::WriteAppend));
                assert_eq!(chunks[1].sql, "SELECT 2");

                assert_eq!(commit.destination, target());
                assert_eq!(commit.disposition, WriteDisposition::WriteEmpty);
                assert_eq!(commit.sql, "SELECT * FROM `p.d.t_bqio_1`");
            }
            other => panic!("expected staged plan, got {:?}", other),
        }
    }

    #[test]
    fn test_staging_address_is_unique_sibling() {
        let a = staging_address(&target()).unwrap();
        let b = staging_address(&target()).unwrap();
        assert_eq!(a.project(), "p");
        assert_eq!(a.dataset(), "d");
        assert!(a.table().starts_with("t_bqio_"));
        assert_ne!(a, b);
    }
}
