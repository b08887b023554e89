use std::process::{Command, Stdio};

use ansi_to_tui::IntoText;
use ratatui::text::Text;
use tracing::debug;

use crate::error::PickerError;
use crate::state::field;

/// Replaces `{}` with the whole line and `{n}` with its n-th field, each
/// single-quoted for the shell. Other braces are copied verbatim.
pub fn expand_placeholders(template: &str, line: &str, delimiter: &str) -> String {
    let mut expanded = String::with_capacity(template.len() + line.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        expanded.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let placeholder = after.find('}').and_then(|close| {
            let inner = &after[..close];
            let value = if inner.is_empty() {
                Some(line)
            } else if inner.chars().all(|ch| ch.is_ascii_digit()) {
                inner
                    .parse::<usize>()
                    .ok()
                    .map(|n| field(line, delimiter, n).unwrap_or(""))
            } else {
                None
            };
            value.map(|value| (close, value))
        });

        match placeholder {
            Some((close, value)) => {
                expanded.push_str(&shell_quote(value));
                rest = &after[close + 1..];
            }
            None => {
                expanded.push('{');
                rest = after;
            }
        }
    }

    expanded.push_str(rest);
    expanded
}

pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Runs `command` through `sh -c` and returns its combined output with ANSI
/// colors translated for rendering.
pub fn render(command: &str) -> Result<Text<'static>, PickerError> {
    debug!(command, "running preview command");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .output()
        .map_err(PickerError::Preview)?;

    let mut bytes = output.stdout;
    bytes.extend_from_slice(&output.stderr);

    match bytes.clone().into_text() {
        Ok(text) => Ok(text),
        Err(_) => Ok(Text::raw(String::from_utf8_lossy(&bytes).into_owned())),
    }
}
