use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::models::config::IndicatorConfig;
use crate::utils::codegen::CodeFile;

/// Write a generated file into `dir`, returning the full path written.
pub fn write_script(file: &CodeFile, dir: &Path) -> Result<PathBuf, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::FileWrite(format!("Cannot create {}: {}", dir.display(), e)))?;
    let path = dir.join(&file.filename);
    write_script_to(&file.code, &path)?;
    Ok(path)
}

/// Write script text to an explicit path.
pub fn write_script_to(code: &str, path: &Path) -> Result<(), AppError> {
    fs::write(path, code)
        .map_err(|e| AppError::FileWrite(format!("Cannot write {}: {}", path.display(), e)))
}

/// Write script text to a stream such as stdout. A closed pipe is reported as
/// a write error instead of a panic.
pub fn write_stream<W: Write>(out: &mut W, code: &str) -> Result<(), AppError> {
    out.write_all(code.as_bytes())
        .and_then(|_| out.flush())
        .map_err(|e| AppError::FileWrite(format!("Cannot write output: {}", e)))
}

/// Save a configuration as pretty-printed JSON.
pub fn write_config_json(config: &IndicatorConfig, path: &Path) -> Result<(), AppError> {
    let mut json = serde_json::to_string_pretty(config)?;
    json.push('\n');
    fs::write(path, json)
        .map_err(|e| AppError::FileWrite(format!("Cannot write {}: {}", path.display(), e)))
}

/// Load a configuration from JSON. Missing fields take their default values.
pub fn load_config_json(path: &Path) -> Result<IndicatorConfig, AppError> {
    if !path.exists() {
        return Err(AppError::FileNotFound(path.display().to_string()));
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::FileRead(format!("Cannot read {}: {}", path.display(), e)))?;
    let config = serde_json::from_str(&raw)?;
    Ok(config)
}
