use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::diagnostics::{Diagnostic, Severity};
use crate::core::model::DictionaryEntry;
use crate::export::text_export::format_entry;
use crate::export::Exporter;
use crate::pipeline::{RunOutput, SourceOutput};

/// Single-page review report: counts per source, the full diagnostics table
/// and every entry that carries an issue tag.
#[derive(Debug, Clone)]
pub struct HtmlReviewExporter {
    out_dir: PathBuf,
}

impl HtmlReviewExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn summary_row(source: &SourceOutput) -> String {
        let count = |severity: Severity| {
            source
                .diagnostics
                .iter()
                .filter(|diagnostic| diagnostic.severity == severity)
                .count()
        };
        format!(
            "<tr><td>{name}</td><td>{entries}</td><td class='error'>{errors}</td><td class='warning'>{warnings}</td><td class='info'>{infos}</td></tr>\n",
            name = html_escape::encode_text(&source.info.name),
            entries = source.corpus.len(),
            errors = count(Severity::Error),
            warnings = count(Severity::Warning),
            infos = count(Severity::Info),
        )
    }

    fn diagnostic_row(diagnostic: &Diagnostic) -> String {
        let location = match (diagnostic.context.page, diagnostic.context.line) {
            (Some(page), Some(line)) => format!("p{page}:{line}"),
            (Some(page), None) => format!("p{page}"),
            _ => String::new(),
        };
        format!(
            "<tr class='{severity}'><td>{severity}</td><td>{source}</td><td>{stage}</td><td>{location}</td><td>{entry}</td><td>{message}</td></tr>\n",
            severity = severity_label(diagnostic.severity),
            source = html_escape::encode_text(&diagnostic.source),
            stage = format!("{:?}", diagnostic.stage).to_lowercase(),
            location = location,
            entry = html_escape::encode_text(diagnostic.context.entry.as_deref().unwrap_or("")),
            message = html_escape::encode_text(&diagnostic.message),
        )
    }

    fn entry_block(entry: &DictionaryEntry) -> String {
        format!(
            "<pre class='entry' id='{id}'>{text}</pre>\n",
            id = html_escape::encode_single_quoted_attribute(&entry.id),
            text = html_escape::encode_text(&format_entry(entry)),
        )
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

impl Exporter for HtmlReviewExporter {
    fn export(&self, run: &RunOutput) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let summary: String = run.sources.iter().map(Self::summary_row).collect();
        let diagnostics: String = run.diagnostics.iter().map(Self::diagnostic_row).collect();
        let flagged: String = run
            .sources
            .iter()
            .flat_map(|source| source.corpus.entries.values())
            .filter(|entry| !entry.issues.is_empty())
            .map(Self::entry_block)
            .collect();

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset='utf-8'>
<title>bejadict review</title>
<style>
body {{ margin: 20px; font-family: Arial, sans-serif; }}
table {{ border-collapse: collapse; margin-bottom: 20px; }}
td, th {{ border: 1px solid #ddd; padding: 4px 8px; text-align: left; vertical-align: top; }}
tr.error {{ background: rgba(255,0,0,0.12); }}
tr.warning {{ background: rgba(255,165,0,0.15); }}
tr.info {{ color: #666; }}
td.error {{ color: #b00; }}
td.warning {{ color: #a60; }}
pre.entry {{ border-left: 3px solid rgba(255,165,0,0.6); padding-left: 8px; }}
</style>
</head>
<body>
<h1>Review</h1>
<h2>Sources</h2>
<table>
<tr><th>source</th><th>entries</th><th>errors</th><th>warnings</th><th>info</th></tr>
{summary}</table>
<h2>Diagnostics ({count})</h2>
<table>
<tr><th>severity</th><th>source</th><th>stage</th><th>where</th><th>entry</th><th>message</th></tr>
{diagnostics}</table>
<h2>Entries with issues</h2>
{flagged}</body>
</html>
"#,
            summary = summary,
            count = run.diagnostics.len(),
            diagnostics = diagnostics,
            flagged = flagged,
        );
        fs::write(self.out_dir.join("review.html"), html)?;
        Ok(())
    }
}
