// dbvault/src/testing.rs
//! In-memory stand-ins for the tool runner, object store and database
//! connection. Each records what it was asked to do into a shared event log
//! so tests can assert on ordering across collaborators.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::{AppError, Result};
use crate::restore::schema_reset::{SchemaAdmin, SchemaConnector};
use crate::storage::{RemoteObject, RemoteStore};
use crate::utils::process::{Pipeline, StageStatus, ToolOutcome, ToolRunner};
use crate::utils::silent_remove_file;

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn record(log: &EventLog, event: impl Into<String>) {
    log.lock().unwrap().push(event.into());
}

/// Pretends to run pipelines. Steps listed in `failures` exit with the
/// given code; successful steps create their output files.
pub struct FakeRunner {
    log: EventLog,
    failures: HashMap<String, i32>,
    pub pipelines: Mutex<Vec<Pipeline>>,
}

impl FakeRunner {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            failures: HashMap::new(),
            pipelines: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_step(mut self, step: &str, code: i32) -> Self {
        self.failures.insert(step.to_string(), code);
        self
    }

    fn touch_outputs(pipeline: &Pipeline) {
        let Some(last) = pipeline.stages.last() else {
            return;
        };
        let mut outputs: Vec<PathBuf> = last.stdout.iter().cloned().collect();
        if let Some(pos) = last.args.iter().position(|a| a == "-out") {
            if let Some(path) = last.args.get(pos + 1) {
                outputs.push(PathBuf::from(path));
            }
        }
        for path in outputs {
            std::fs::write(path, b"fake output").unwrap();
        }
    }
}

impl ToolRunner for FakeRunner {
    fn run(&self, pipeline: &Pipeline) -> Result<ToolOutcome> {
        record(&self.log, format!("run:{}", pipeline.step));
        self.pipelines.lock().unwrap().push(pipeline.clone());

        let code = self.failures.get(&pipeline.step).copied().unwrap_or(0);
        if code == 0 {
            Self::touch_outputs(pipeline);
        }
        let last = pipeline.stages.len().saturating_sub(1);
        Ok(ToolOutcome {
            statuses: pipeline
                .stages
                .iter()
                .enumerate()
                .map(|(i, stage)| StageStatus {
                    program: stage.program.clone(),
                    code: if i == last { code } else { 0 },
                })
                .collect(),
            stderr: if code == 0 {
                String::new()
            } else {
                format!("{}: simulated failure\n", pipeline.step)
            },
        })
    }
}

pub struct FakeStore {
    log: EventLog,
    objects: Vec<RemoteObject>,
    fail_list: bool,
    fail_upload: bool,
    pub uploads: Mutex<Vec<(PathBuf, String)>>,
}

impl FakeStore {
    pub fn new(log: &EventLog, objects: Vec<RemoteObject>) -> Self {
        Self {
            log: log.clone(),
            objects,
            fail_list: false,
            fail_upload: false,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_upload(mut self) -> Self {
        self.fail_upload = true;
        self
    }
}

pub fn remote_object(name: &str, modified_time: &str, size: u64) -> RemoteObject {
    RemoteObject {
        name: name.to_string(),
        id: format!("nightly/{}", name),
        modified_time: modified_time.to_string(),
        size,
        container: "db-backups".to_string(),
    }
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list_objects(&self) -> Result<Vec<RemoteObject>> {
        record(&self.log, "store:list");
        if self.fail_list {
            return Err(AppError::Storage("access denied".to_string()));
        }
        Ok(self.objects.clone())
    }

    async fn upload_file(&self, local_path: &Path, name: &str) -> Result<String> {
        record(&self.log, format!("store:upload:{}", name));
        if self.fail_upload {
            return Err(AppError::Storage("connection reset".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((local_path.to_path_buf(), name.to_string()));
        Ok(format!("nightly/{}", name))
    }

    async fn resolve_id_by_name(&self, name: &str) -> Result<String> {
        record(&self.log, format!("store:resolve:{}", name));
        self.objects
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.id.clone())
            .ok_or_else(|| AppError::NotFound(name.to_string()))
    }

    async fn download_object(&self, id: &str, destination: &Path) -> Result<u64> {
        record(&self.log, format!("store:download:{}", id));
        silent_remove_file(destination)?;
        std::fs::write(destination, b"encrypted")?;
        Ok(9)
    }
}

#[derive(Debug, Default)]
pub struct SchemaState {
    pub tables: Vec<String>,
    pub listed_schemas: Vec<String>,
    pub transactions: Vec<Vec<String>>,
    pub fail_transaction: bool,
    pub connects: usize,
    pub closes: usize,
}

pub struct FakeConnector {
    log: EventLog,
    pub state: Arc<Mutex<SchemaState>>,
}

impl FakeConnector {
    pub fn new(log: &EventLog, tables: &[&str]) -> Self {
        Self {
            log: log.clone(),
            state: Arc::new(Mutex::new(SchemaState {
                tables: tables.iter().map(|t| t.to_string()).collect(),
                ..SchemaState::default()
            })),
        }
    }
}

#[async_trait]
impl SchemaConnector for FakeConnector {
    async fn connect(&self) -> Result<Box<dyn SchemaAdmin>> {
        record(&self.log, "db:connect");
        self.state.lock().unwrap().connects += 1;
        Ok(Box::new(FakeSchemaAdmin {
            log: self.log.clone(),
            state: self.state.clone(),
        }))
    }
}

pub struct FakeSchemaAdmin {
    log: EventLog,
    state: Arc<Mutex<SchemaState>>,
}

impl FakeSchemaAdmin {
    pub fn standalone(tables: &[&str]) -> (Self, Arc<Mutex<SchemaState>>) {
        let connector = FakeConnector::new(&event_log(), tables);
        let state = connector.state.clone();
        (
            Self {
                log: connector.log,
                state: state.clone(),
            },
            state,
        )
    }
}

#[async_trait]
impl SchemaAdmin for FakeSchemaAdmin {
    async fn list_tables(&mut self, schema: &str) -> Result<Vec<String>> {
        record(&self.log, "db:list_tables");
        let mut state = self.state.lock().unwrap();
        state.listed_schemas.push(schema.to_string());
        Ok(state.tables.clone())
    }

    async fn execute_in_transaction(&mut self, statements: &[String]) -> Result<()> {
        record(&self.log, "db:transaction");
        let mut state = self.state.lock().unwrap();
        if state.fail_transaction {
            return Err(AppError::Database(sqlx::Error::Protocol("simulated rollback".to_string())));
        }
        state.transactions.push(statements.to_vec());
        state.tables.clear();
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        record(&self.log, "db:close");
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }
}
