//! The macro-strip pass that runs before parsing.

use crate::error::PreprocessError;

/// Strip `#define … #enddef` regions, `{…}` macro invocations and `#`
/// comment lines from scenario text.
///
/// Macro expansion is the loader's concern, not the grammar's; the parser
/// only ever sees the stripped text. Newlines always pass through so line
/// numbers in later diagnostics refer to the original input.
pub fn preprocess(input: &str) -> Result<String, PreprocessError> {
    let mut out = String::with_capacity(input.len());
    let mut define_open: Option<usize> = None;
    let mut brace_stack: Vec<usize> = Vec::new();

    for (idx, raw) in input.split_inclusive('\n').enumerate() {
        let line = idx + 1;
        let (text, newline) = match raw.strip_suffix('\n') {
            Some(t) => (t, true),
            None => (raw, false),
        };

        if text.starts_with('#') {
            match text[1..].split_whitespace().next().unwrap_or("") {
                "define" => {
                    if let Some(outer_line) = define_open {
                        return Err(PreprocessError::NestedDefine { line, outer_line });
                    }
                    define_open = Some(line);
                }
                "enddef" => {
                    if define_open.take().is_none() {
                        return Err(PreprocessError::EnddefWithoutDefine { line });
                    }
                }
                _ => {} // comment line
            }
            // every '#' line reduces to a bare newline
            if newline {
                out.push('\n');
            }
            continue;
        }

        for c in text.chars() {
            match c {
                '{' => brace_stack.push(line),
                '}' => {
                    if brace_stack.pop().is_none() {
                        return Err(PreprocessError::UnmatchedBrace { line });
                    }
                }
                _ => {
                    if define_open.is_none() && brace_stack.is_empty() {
                        out.push(c);
                    }
                }
            }
        }
        if newline {
            out.push('\n');
        }
    }

    if let Some(line) = define_open {
        return Err(PreprocessError::UnterminatedDefine { line });
    }
    if let Some(&line) = brace_stack.first() {
        return Err(PreprocessError::UnclosedBrace { line });
    }
    Ok(out)
}
