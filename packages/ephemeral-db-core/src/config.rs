//! Scenario configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::HarnessError;
use crate::provider::{InstanceRequest, ReadinessCheck};
use crate::statements::is_valid_identifier;

/// Log line PostgreSQL prints once it accepts connections.
pub const POSTGRES_READY_LINE: &str = "database system is ready to accept connections";

/// Characters escaped in the user, password and database parts of a URL.
const URL_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

fn encode(component: &str) -> String {
    utf8_percent_encode(component, URL_COMPONENT).to_string()
}

/// Scenario configuration.
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Image reference, `name[:tag]`
    pub image: String,
    /// Port the database listens on inside the container
    pub port: u16,
    /// Database name
    pub database: String,
    /// Login user
    pub user: String,
    /// Login password
    pub password: String,
    /// Table the scenario creates
    pub table: String,
    /// Name written by the insert step and read back by the select step
    pub insert_name: String,
    /// Name removed by the delete step and checked for absence afterwards
    pub delete_name: String,
    /// Upper bound on container start plus port readiness, in milliseconds
    pub readiness_timeout_ms: u64,
    /// Upper bound on opening the connection, in milliseconds
    pub connect_timeout_ms: u64,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            image: "postgres:latest".to_string(),
            port: 5432,
            database: "testdb".to_string(),
            user: "testuser".to_string(),
            password: "testpassword".to_string(),
            table: "users".to_string(),
            insert_name: "TEST".to_string(),
            // Never inserted, so the absence check passes without a delete.
            delete_name: "Alice".to_string(),
            readiness_timeout_ms: 60_000, // image pull not included
            connect_timeout_ms: 10_000,
        }
    }
}

impl ScenarioConfig {
    /// Validates the configuration before anything is provisioned.
    pub fn validate(&self) -> Result<(), HarnessError> {
        ImageRef::parse(&self.image)?;
        if self.port == 0 {
            return Err(HarnessError::Config("port must be non-zero".to_string()));
        }
        for (field, value) in [
            ("database", &self.database),
            ("user", &self.user),
            ("password", &self.password),
        ] {
            if value.is_empty() {
                return Err(HarnessError::Config(format!("{field} must not be empty")));
            }
        }
        if !is_valid_identifier(&self.table) {
            return Err(HarnessError::Config(format!(
                "table '{}' is not a plain identifier",
                self.table
            )));
        }
        for (field, value) in [
            ("insert_name", &self.insert_name),
            ("delete_name", &self.delete_name),
        ] {
            if value.is_empty() {
                return Err(HarnessError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_millis(self.readiness_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Builds the provisioning request for this configuration.
    pub fn instance_request(&self) -> InstanceRequest {
        let env = BTreeMap::from([
            ("POSTGRES_DB".to_string(), self.database.clone()),
            ("POSTGRES_USER".to_string(), self.user.clone()),
            ("POSTGRES_PASSWORD".to_string(), self.password.clone()),
        ]);
        InstanceRequest {
            image: self.image.clone(),
            exposed_port: self.port,
            env,
            readiness: vec![
                ReadinessCheck::LogMessage(POSTGRES_READY_LINE.to_string()),
                ReadinessCheck::PortListening,
            ],
            readiness_timeout: self.readiness_timeout(),
        }
    }

    /// Connection string for the resolved endpoint.
    ///
    /// User, password and database are percent-encoded.
    pub fn connection_url(&self, host: &str, port: u16) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            encode(&self.user),
            encode(&self.password),
            host,
            port,
            encode(&self.database)
        )
    }

    /// Connection string with the password masked, for logs.
    pub fn redacted_url(&self, host: &str, port: u16) -> String {
        format!(
            "postgres://{}:***@{}:{}/{}",
            encode(&self.user),
            host,
            port,
            encode(&self.database)
        )
    }
}

/// Image reference split into repository and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub tag: String,
}

impl ImageRef {
    /// Parses `name[:tag]`. A colon before the last `/` belongs to a
    /// registry host and is not a tag separator.
    pub fn parse(reference: &str) -> Result<Self, HarnessError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(HarnessError::Config(
                "image reference must not be empty".to_string(),
            ));
        }
        let path_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (name, tag) = match reference[path_start..].rfind(':') {
            Some(i) => {
                let split = path_start + i;
                (&reference[..split], &reference[split + 1..])
            }
            None => (reference, "latest"),
        };
        if name.is_empty() || tag.is_empty() {
            return Err(HarnessError::Config(format!(
                "malformed image reference '{reference}'"
            )));
        }
        Ok(Self {
            name: name.to_string(),
            tag: tag.to_string(),
        })
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}
