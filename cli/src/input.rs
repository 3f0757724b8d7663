use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

/// Read the contents of `path` as a string, or stdin when the path is `-`.
pub fn read_input_string(path: &Path, what: &str) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .with_context(|| format!("Failed to read {} from stdin", what))?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {} file {}", what, path.display()))
    }
}
