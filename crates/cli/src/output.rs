//! JSON result file

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

/// Write `value` as pretty-printed JSON, creating parent directories
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json)
}
