//! JSON output for scripting and automation.
//!
//! Results are written pretty-printed, one document per command, followed
//! by a newline.

use std::io::Write;

use serde::Serialize;

use super::OutputError;

/// Write `value` as pretty-printed JSON followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<T: Serialize + ?Sized>(value: &T, writer: &mut dyn Write) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(value)?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Pretty JSON for text mode, where serialization failures surface as I/O
/// errors.
pub(crate) fn write_json_text<T: Serialize + ?Sized>(
    value: &T,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    match write_json(value, writer) {
        Ok(()) => Ok(()),
        Err(OutputError::Io(e)) => Err(e),
        Err(OutputError::Serialization(e)) => Err(std::io::Error::other(e)),
    }
}
