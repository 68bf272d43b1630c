//! Parse command implementation.

use std::fs;
use std::path::PathBuf;

use thane::gml;

use super::CliError;

/// Execute the parse command: preprocess and parse a scenario file, print
/// the tree.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub(crate) fn execute(file: PathBuf, raw: bool) -> Result<(), CliError> {
    let text = fs::read_to_string(&file)
        .map_err(|e| CliError::new(format!("Failed to read {}: {e}", file.display())))?;

    let stripped = if raw {
        text
    } else {
        gml::preprocess(&text)
            .map_err(|e| CliError::new(format!("{}: {e}", file.display())))?
    };

    let config = gml::parse_config(&stripped)
        .map_err(|e| CliError::new(format!("{}: {e}", file.display())))?;

    for node in &config {
        print!("{node}");
    }
    Ok(())
}
