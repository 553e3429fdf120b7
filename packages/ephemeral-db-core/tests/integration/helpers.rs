//! In-memory provider and client with fault injection.

use std::sync::{Arc, Mutex, MutexGuard};

use ephemeral_db_core::statements::step;
use ephemeral_db_core::{
    Connector, DatabaseClient, EphemeralInstance, HarnessError, InstanceProvider, InstanceRequest,
    Record,
};

/// Failure to inject into the fake backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Provision,
    Host,
    Connect,
    /// Execute or query fails at this step
    Step(&'static str),
    /// Select returns the inserted name lowercased
    WrongName,
    /// Select returns the inserted row twice
    DuplicateRow,
    /// Delete silently does nothing and the deleted name shows up afterwards
    StickyDelete,
    Close,
    Teardown,
}

/// Observable state shared by every fake handle.
#[derive(Debug, Default)]
pub struct FakeState {
    pub requests: Vec<InstanceRequest>,
    pub terminated: usize,
    pub connect_urls: Vec<String>,
    pub closed: usize,
    pub statements: Vec<String>,
    pub table_exists: bool,
    pub rows: Vec<Record>,
    next_id: i32,
}

/// Fake backend acting as both provider and connector.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
    faults: Arc<Vec<Fault>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: &[Fault]) -> Self {
        Self {
            state: Arc::default(),
            faults: Arc::new(faults.to_vec()),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn has(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }
}

impl InstanceProvider for FakeBackend {
    type Instance = FakeInstance;

    async fn provision(&self, request: &InstanceRequest) -> Result<FakeInstance, HarnessError> {
        self.state().requests.push(request.clone());
        if self.has(Fault::Provision) {
            return Err(HarnessError::Provision {
                image: request.image.clone(),
                reason: "daemon unreachable".to_string(),
            });
        }
        let n = self.state().requests.len();
        Ok(FakeInstance {
            id: format!("fake-{n}"),
            backend: self.clone(),
        })
    }
}

#[derive(Debug)]
pub struct FakeInstance {
    id: String,
    backend: FakeBackend,
}

impl EphemeralInstance for FakeInstance {
    fn id(&self) -> &str {
        &self.id
    }

    async fn host(&self) -> Result<String, HarnessError> {
        if self.backend.has(Fault::Host) {
            return Err(HarnessError::Endpoint("no host".to_string()));
        }
        Ok("localhost".to_string())
    }

    async fn mapped_port(&self, container_port: u16) -> Result<u16, HarnessError> {
        Ok(container_port + 10_000)
    }

    async fn terminate(self) -> Result<(), HarnessError> {
        self.backend.state().terminated += 1;
        if self.backend.has(Fault::Teardown) {
            return Err(HarnessError::Teardown("container already gone".to_string()));
        }
        Ok(())
    }
}

impl Connector for FakeBackend {
    type Client = FakeClient;

    async fn connect(&self, url: &str) -> Result<FakeClient, HarnessError> {
        self.state().connect_urls.push(url.to_string());
        if self.has(Fault::Connect) {
            return Err(HarnessError::Connect("connection refused".to_string()));
        }
        Ok(FakeClient {
            backend: self.clone(),
        })
    }
}

pub struct FakeClient {
    backend: FakeBackend,
}

impl FakeClient {
    fn check(&self, step: &'static str, sql: &str) -> Result<(), HarnessError> {
        self.backend.state().statements.push(sql.to_string());
        if self.backend.has(Fault::Step(step)) {
            return Err(HarnessError::sql(step, "injected failure"));
        }
        if step != step::CREATE_TABLE && !self.backend.state().table_exists {
            return Err(HarnessError::sql(step, "relation does not exist"));
        }
        Ok(())
    }
}

impl DatabaseClient for FakeClient {
    async fn execute(
        &mut self,
        step: &'static str,
        sql: &str,
        params: &[&str],
    ) -> Result<u64, HarnessError> {
        self.check(step, sql)?;
        let sticky = self.backend.has(Fault::StickyDelete);
        let mut state = self.backend.state();
        match step {
            step::CREATE_TABLE => {
                state.table_exists = true;
                Ok(0)
            }
            step::INSERT => {
                state.next_id += 1;
                let record = Record::new(state.next_id, params[0])?;
                state.rows.push(record);
                Ok(1)
            }
            step::DELETE if sticky => {
                state.next_id += 1;
                let record = Record::new(state.next_id, params[0])?;
                state.rows.push(record);
                Ok(0)
            }
            step::DELETE => {
                let before = state.rows.len();
                state.rows.retain(|r| r.name != params[0]);
                Ok((before - state.rows.len()) as u64)
            }
            other => Err(HarnessError::sql(other, "unexpected statement")),
        }
    }

    async fn query_records(
        &mut self,
        step: &'static str,
        sql: &str,
        params: &[&str],
    ) -> Result<Vec<Record>, HarnessError> {
        self.check(step, sql)?;
        let mut rows: Vec<Record> = self
            .backend
            .state()
            .rows
            .iter()
            .filter(|r| r.name == params[0])
            .cloned()
            .collect();
        if step == step::SELECT {
            if self.backend.has(Fault::WrongName) {
                for row in &mut rows {
                    row.name = row.name.to_lowercase();
                }
            }
            if self.backend.has(Fault::DuplicateRow) {
                rows.extend(rows.clone());
            }
        }
        Ok(rows)
    }

    async fn close(self) -> Result<(), HarnessError> {
        self.backend.state().closed += 1;
        if self.backend.has(Fault::Close) {
            return Err(HarnessError::Connect("close failed".to_string()));
        }
        Ok(())
    }
}

/// Installs a test log subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
