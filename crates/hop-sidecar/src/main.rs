use std::env;
use std::io;
use std::process::ExitCode;

use hop_sidecar::{JsonLineSink, SidecarConfig, SidecarServer};
use serde::Serialize;

const ENV_LISTEN_ADDR: &str = "HOPGATE_LISTEN_ADDR";
const ENV_LISTEN_PORT: &str = "HOPGATE_LISTEN_PORT";
const ENV_MAX_LINE_BYTES: &str = "HOPGATE_MAX_LINE_BYTES";
const ENV_MAX_ESTABLISHING_BUFFER_BYTES: &str = "HOPGATE_MAX_ESTABLISHING_BUFFER_BYTES";

const STATUS_SCHEMA: &str = "hopgate-status-v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitClass {
    Ok,
    ConfigInvalid,
    BindFailed,
    RuntimeFailed,
}

impl ExitClass {
    fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::ConfigInvalid => 20,
            Self::BindFailed => 21,
            Self::RuntimeFailed => 22,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::ConfigInvalid => "config_invalid",
            Self::BindFailed => "bind_failed",
            Self::RuntimeFailed => "runtime_failed",
        }
    }
}

#[derive(Debug)]
struct RunOutcome {
    class: ExitClass,
    detail: Option<String>,
}

impl RunOutcome {
    fn error(class: ExitClass, detail: impl Into<String>) -> Self {
        Self {
            class,
            detail: Some(detail.into()),
        }
    }
}

#[derive(Serialize)]
struct StatusRecord<'a> {
    schema: &'static str,
    event: &'static str,
    class: &'static str,
    detail: Option<&'a str>,
}

fn main() -> ExitCode {
    let outcome = run();
    emit_status(&outcome);
    ExitCode::from(outcome.class.code())
}

fn run() -> RunOutcome {
    let config = match config_from_env() {
        Ok(config) => config,
        Err(detail) => return RunOutcome::error(ExitClass::ConfigInvalid, detail),
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(error) => return RunOutcome::error(ExitClass::RuntimeFailed, error.to_string()),
    };

    runtime.block_on(async {
        let sink = JsonLineSink::new(io::stderr());
        let server = match SidecarServer::new(config, sink) {
            Ok(server) => server,
            Err(error) => return RunOutcome::error(ExitClass::ConfigInvalid, error.to_string()),
        };
        let listener = match server.bind_listener().await {
            Ok(listener) => listener,
            Err(error) => return RunOutcome::error(ExitClass::BindFailed, error.to_string()),
        };
        match server.run_with_listener(listener).await {
            Ok(()) => RunOutcome {
                class: ExitClass::Ok,
                detail: None,
            },
            Err(error) => RunOutcome::error(ExitClass::RuntimeFailed, error.to_string()),
        }
    })
}

fn config_from_env() -> Result<SidecarConfig, String> {
    let defaults = SidecarConfig::default();
    Ok(SidecarConfig {
        listen_addr: env_string(ENV_LISTEN_ADDR, defaults.listen_addr)?,
        listen_port: env_u16(ENV_LISTEN_PORT, defaults.listen_port)?,
        max_line_bytes: env_usize(ENV_MAX_LINE_BYTES, defaults.max_line_bytes)?,
        max_establishing_buffer_bytes: env_usize(
            ENV_MAX_ESTABLISHING_BUFFER_BYTES,
            defaults.max_establishing_buffer_bytes,
        )?,
    })
}

fn env_string(name: &'static str, default: String) -> Result<String, String> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => Err(format!("{name} must not be empty")),
        Ok(value) => Ok(value),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(error) => Err(format!("{name}: {error}")),
    }
}

fn env_u16(name: &'static str, default: u16) -> Result<u16, String> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<u16>()
            .map_err(|_| format!("{name} must be a port number, got {value:?}")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(error) => Err(format!("{name}: {error}")),
    }
}

fn env_usize(name: &'static str, default: usize) -> Result<usize, String> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("{name} must be an unsigned integer, got {value:?}")),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(error) => Err(format!("{name}: {error}")),
    }
}

fn emit_status(outcome: &RunOutcome) {
    let record = StatusRecord {
        schema: STATUS_SCHEMA,
        event: "exit",
        class: outcome.class.label(),
        detail: outcome.detail.as_deref(),
    };
    match serde_json::to_string(&record) {
        Ok(line) => eprintln!("{line}"),
        Err(_) => eprintln!("{}", outcome.class.label()),
    }
}
