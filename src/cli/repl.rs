//! Repl command implementation: an interactive line-at-a-time session
//! against a live engine.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use thane::Engine;

use super::CliError;

/// Execute the repl command.
///
/// # Errors
///
/// Returns an error if the init script cannot be read or refuses to load.
pub(crate) fn execute(script: PathBuf) -> Result<(), CliError> {
    let source = fs::read_to_string(&script)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", script.display())))?;

    let mut engine = Engine::new(&source)
        .map_err(|e| CliError::new(format!("{}: {e}", script.display())))?;
    engine.set_external_log(Some(Box::new(io::stdout())));

    println!("Loaded {}. Type Lua, or q to quit.", script.display());
    print!("> ");
    let _ = io::stdout().flush();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.map_err(|e| CliError::new(format!("stdin: {e}")))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed == "q" || trimmed == "Q" {
            break;
        }

        let result = engine.execute(trimmed);
        if let Some(error) = result.error {
            println!("-------------------------");
            println!("Error: {error}");
            println!("-------------------------");
        }

        print!("> ");
        let _ = io::stdout().flush();
    }

    println!("Bye.");
    Ok(())
}
