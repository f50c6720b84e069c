//! Loader for the OCR collaborator's page files: JSON Lines, one `RawPage`
//! per line.

use std::fs;
use std::path::Path;

use crate::core::error::PipelineError;
use crate::core::model::RawPage;

pub fn parse_pages(data: &str, path: &Path) -> Result<Vec<RawPage>, PipelineError> {
    let mut pages = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let page: RawPage = serde_json::from_str(line).map_err(|err| PipelineError::Input {
            path: path.to_path_buf(),
            message: format!("line {}: {err}", idx + 1),
        })?;
        pages.push(page);
    }
    Ok(pages)
}

pub fn load_pages(path: &Path) -> Result<Vec<RawPage>, PipelineError> {
    let data = fs::read_to_string(path).map_err(|err| PipelineError::Input {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    parse_pages(&data, path)
}
