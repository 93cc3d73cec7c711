pub mod config;
pub mod customer;
pub mod list;
pub mod migrate;
pub mod seed;

use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

use clientele_core::config::{AppConfig, LoadOptions};
use clientele_core::errors::ApplicationError;
use clientele_db::{connect_with_settings, migrations, DbPool, RepositoryError};

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME_INIT: u8 = 3;
pub const EXIT_DB_CONNECTIVITY: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_EXECUTION: u8 = 6;
pub const EXIT_VALIDATION: u8 = 7;
pub const EXIT_NOT_FOUND: u8 = 8;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Error class, message and exit code of a failed command step.
pub(crate) type Failure = (&'static str, String, u8);

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::ok(command, message.into(), None)
    }

    pub fn success_with_data(command: &str, message: impl Into<String>, data: Value) -> Self {
        Self::ok(command, message.into(), Some(data))
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub(crate) fn from_failure(command: &str, (error_class, message, exit_code): Failure) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }

    fn ok(command: &str, message: String, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }
}

/// Loads configuration and builds the single-threaded runtime a command
/// runs on.
pub(crate) fn prepare(command: &str) -> Result<(AppConfig, Runtime), CommandResult> {
    let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })?;

    let runtime =
        tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME_INIT,
            )
        })?;

    Ok((config, runtime))
}

/// Runs a command body that reports a message plus a JSON data payload.
pub(crate) fn execute<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(AppConfig) -> Fut,
    Fut: Future<Output = Result<(String, Value), Failure>>,
{
    let (config, runtime) = match prepare(command) {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    match runtime.block_on(body(config)) {
        Ok((message, data)) => CommandResult::success_with_data(command, message, data),
        Err(failure) => {
            tracing::debug!(
                event_name = "cli.command.failed",
                command,
                error_class = failure.0,
                exit_code = failure.2,
                "command failed"
            );
            CommandResult::from_failure(command, failure)
        }
    }
}

/// Connects to the configured database and brings its schema up to date.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, Failure> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DB_CONNECTIVITY))?;

    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

    Ok(pool)
}

pub(crate) fn execution_failure(error: RepositoryError) -> Failure {
    let error = ApplicationError::from(error);
    (error.error_class(), error.to_string(), EXIT_EXECUTION)
}

pub(crate) fn to_data(value: &impl Serialize) -> Result<Value, Failure> {
    serde_json::to_value(value)
        .map_err(|error| ("serialization", error.to_string(), EXIT_EXECUTION))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::CommandResult;

    #[test]
    fn success_payload_omits_data_when_absent() {
        let result = CommandResult::success("migrate", "applied pending migrations");
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 0);
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["error_class"], Value::Null);
        assert!(payload.get("data").is_none());
    }

    #[test]
    fn failure_payload_carries_class_and_exit_code() {
        let result = CommandResult::failure("show", "not_found", "no customer", 8);
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(result.exit_code, 8);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "not_found");
    }

    #[test]
    fn data_is_embedded_verbatim() {
        let result = CommandResult::success_with_data("list", "1 customer", json!({"totalCount": 1}));
        let payload: Value = serde_json::from_str(&result.output).expect("json");

        assert_eq!(payload["data"]["totalCount"], 1);
    }
}
