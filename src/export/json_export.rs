use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::export::Exporter;
use crate::pipeline::RunOutput;

/// Writes `<source>.json` per source, `corpus.json` for the merged corpus
/// and `diagnostics.json` with the ordered diagnostics stream.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn write(&self, name: &str, data: String) -> Result<()> {
        let path = self.out_dir.join(name);
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))
    }
}

impl Exporter for JsonExporter {
    fn export(&self, run: &RunOutput) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        for source in &run.sources {
            self.write(&format!("{}.json", source.info.id), source.corpus.to_json()?)?;
        }
        if let Some(merged) = &run.merged {
            self.write("corpus.json", merged.to_json()?)?;
        }
        self.write(
            "diagnostics.json",
            serde_json::to_string_pretty(&run.diagnostics)?,
        )?;
        tracing::info!(out = %self.out_dir.display(), "wrote JSON output");
        Ok(())
    }
}
