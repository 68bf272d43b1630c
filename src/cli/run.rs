//! Run command implementation: load an init script, execute a command
//! stream, report the outcomes.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use thane::{Engine, EventResult};

use super::{CliError, OutputFormat};

/// One executed line and its outcome, for the JSON report.
#[derive(Debug, Serialize)]
struct LineOutcome {
    line: usize,
    code: String,
    #[serde(flatten)]
    result: EventResult,
}

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if a file cannot be read, the scenario refuses to
/// load, or any executed line fails.
pub(crate) fn execute(
    script: PathBuf,
    commands: Option<PathBuf>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let source = fs::read_to_string(&script)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", script.display())))?;

    let mut engine = Engine::new(&source)
        .map_err(|e| CliError::new(format!("{}: {e}", script.display())))?;

    let mut outcomes = Vec::new();
    let mut failed = false;
    if let Some(commands) = commands {
        let stream = fs::read_to_string(&commands)
            .map_err(|e| CliError::new(format!("Failed to read {}: {e}", commands.display())))?;
        for (idx, line) in stream.lines().enumerate() {
            let code = line.trim();
            if code.is_empty() || code.starts_with("--") {
                continue;
            }
            let result = engine.execute(code);
            failed |= result.error.is_some();
            outcomes.push(LineOutcome {
                line: idx + 1,
                code: code.to_string(),
                result,
            });
        }
    }

    match format {
        OutputFormat::Text => {
            for outcome in &outcomes {
                match &outcome.result.error {
                    Some(error) => println!("line {}: ERROR {error}", outcome.line),
                    None => println!("line {}: ok", outcome.line),
                }
            }
            println!();
            println!("turn {}, side {} playing", engine.turn_number(), engine.current_side_playing());
            print!("{}", engine.log());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&outcomes)
                .map_err(|e| CliError::new(format!("Failed to serialize results: {e}")))?;
            println!("{json}");
        }
    }

    if failed {
        Err(CliError::new("one or more commands failed"))
    } else {
        Ok(())
    }
}
