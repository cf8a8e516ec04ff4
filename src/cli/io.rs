//! JSON output for the CLI
//!
//! Every command prints exactly one JSON object on stdout:
//! - `{"status":"ok","data":...}`
//! - `{"status":"error","code":...,"message":...,"retryable":...}`

use std::io::{self, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Success response envelope
pub fn response_json(data: Value) -> Value {
    serde_json::json!({
        "status": "ok",
        "data": data
    })
}

/// Error response envelope
pub fn error_json(error: &CliError) -> Value {
    serde_json::json!({
        "status": "error",
        "code": error.code_str(),
        "message": error.message(),
        "retryable": error.is_retryable()
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&response_json(data))
}

/// Write an error response to stdout
pub fn write_error(error: &CliError) -> CliResult<()> {
    write_json(&error_json(error))
}

fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::errors::CliErrorCode;

    #[test]
    fn test_error_envelope() {
        let err = CliError::new(CliErrorCode::NotRegistered, "node \"a\" is not registered yet");
        let json = error_json(&err);

        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "AEROKEEPER_NOT_REGISTERED");
        assert_eq!(json["retryable"], false);
    }

    #[test]
    fn test_response_envelope() {
        let json = response_json(serde_json::json!({"node_id": 3}));
        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"]["node_id"], 3);
    }
}
