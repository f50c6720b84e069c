use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::{validate_sources, ConfigFile, SourceConfig};
use crate::core::diagnostics::{Diagnostic, DiagnosticContext, RunContext, Severity, Stage};
use crate::core::error::PipelineError;
use crate::core::model::{Corpus, RawPage, SourceInfo};
use crate::export::html_review_export::HtmlReviewExporter;
use crate::export::json_export::JsonExporter;
use crate::export::text_export::TextExporter;
use crate::export::Exporter;
use crate::extract::{extract_entries, FieldExtractor};
use crate::input::load_pages;
use crate::layout::{tokenize_source, SourceTokenizer};
use crate::normalize::{CleanPage, PageNormalizer};
use crate::resolve::CrossReferenceResolver;
use crate::segment::segment;
use crate::validate::{build_corpus, merge_corpora, validate_source};

/// Diagnostics source label for the cross-source merge step.
pub const MERGE_SOURCE: &str = "corpus";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sources: Vec<SourceConfig>,
    pub output: PathBuf,
    pub merge: bool,
    pub generated_at: DateTime<Utc>,
}

impl PipelineConfig {
    pub fn new(sources: Vec<SourceConfig>, output: PathBuf, generated_at: DateTime<Utc>) -> Self {
        Self {
            sources,
            output,
            merge: true,
            generated_at,
        }
    }

    pub fn from_file(file: ConfigFile, output: PathBuf, generated_at: DateTime<Utc>) -> Self {
        Self {
            merge: file.merge,
            ..Self::new(file.sources, output, generated_at)
        }
    }

    pub fn timestamp(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}

/// Result of one source: its corpus plus the diagnostics stream of its run.
#[derive(Debug, Clone)]
pub struct SourceOutput {
    pub info: SourceInfo,
    pub corpus: Corpus,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub sources: Vec<SourceOutput>,
    pub merged: Option<Corpus>,
    /// Every diagnostic of the run: each source in order, then the merge.
    pub diagnostics: Vec<Diagnostic>,
}

impl RunOutput {
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == severity)
            .count()
    }

    pub fn source(&self, id: &str) -> Option<&SourceOutput> {
        self.sources.iter().find(|output| output.info.id == id)
    }
}

/// Runs every stage over the pages of one source. Per-page and per-entry
/// problems end up in the returned diagnostics; only configuration and
/// structural failures are errors.
pub fn process_source(
    source: &SourceConfig,
    pages: &[RawPage],
    generated_at: &str,
) -> Result<SourceOutput, PipelineError> {
    source.validate()?;
    let mut run = RunContext::new(&source.id);
    let normalizer = PageNormalizer::new(&source.furniture, &source.id)?;

    let mut ordered: Vec<&RawPage> = Vec::with_capacity(pages.len());
    for page in pages {
        if page.source != source.id {
            run.warn(
                Stage::Normalize,
                DiagnosticContext::page(page.page_idx),
                format!("page belongs to source '{}' and was skipped", page.source),
            );
            continue;
        }
        ordered.push(page);
    }
    ordered.sort_by_key(|page| page.page_idx);
    ordered.dedup_by(|later, earlier| {
        let duplicate = later.page_idx == earlier.page_idx;
        if duplicate {
            run.warn(
                Stage::Normalize,
                DiagnosticContext::page(later.page_idx),
                "duplicate page index; keeping the first copy",
            );
        }
        duplicate
    });

    let clean: Vec<CleanPage> = ordered
        .iter()
        .map(|page| normalizer.normalize(page, &mut run))
        .collect();

    let tokenizer = SourceTokenizer::from_config(&source.layout);
    let tokens = tokenize_source(&tokenizer, &clean, &mut run);
    let spans = segment(&source.id, tokens, &tokenizer, &mut run);

    let extractor = FieldExtractor::new(source.layout.markers());
    let mut entries = extract_entries(&extractor, &spans, &mut run);

    CrossReferenceResolver::new(source.layout.markers()).resolve(&mut entries, &mut run);
    validate_source(&mut entries, &mut run)?;

    let info = SourceInfo {
        id: source.id.clone(),
        name: source.display_name().to_string(),
    };
    let corpus = build_corpus(info.clone(), entries, generated_at)?;

    tracing::info!(
        source = %source.id,
        pages = clean.len(),
        spans = spans.len(),
        entries = corpus.len(),
        errors = run.count(Severity::Error),
        warnings = run.count(Severity::Warning),
        "processed source"
    );

    Ok(SourceOutput {
        info,
        corpus,
        diagnostics: run.into_diagnostics(),
    })
}

/// Builds every configured source from already loaded pages, `pages[i]`
/// belonging to `config.sources[i]`, and merges them when asked to.
pub fn build_run(config: &PipelineConfig, pages: &[Vec<RawPage>]) -> Result<RunOutput> {
    validate_sources(&config.sources)?;
    if pages.len() != config.sources.len() {
        anyhow::bail!(
            "got pages for {} source(s) but {} are configured",
            pages.len(),
            config.sources.len()
        );
    }

    let generated_at = config.timestamp();
    let mut sources = Vec::with_capacity(config.sources.len());
    let mut diagnostics = Vec::new();
    for (source, source_pages) in config.sources.iter().zip(pages) {
        let output = process_source(source, source_pages, &generated_at)
            .with_context(|| format!("failed to process source '{}'", source.id))?;
        diagnostics.extend(output.diagnostics.iter().cloned());
        sources.push(output);
    }

    let merged = if config.merge {
        let mut run = RunContext::new(MERGE_SOURCE);
        let corpora: Vec<Corpus> = sources.iter().map(|output| output.corpus.clone()).collect();
        let merged = merge_corpora(&corpora, &generated_at, &mut run)
            .context("failed to merge source corpora")?;
        diagnostics.extend(run.into_diagnostics());
        Some(merged)
    } else {
        None
    };

    Ok(RunOutput {
        sources,
        merged,
        diagnostics,
    })
}

/// Loads each source's page file as named by its configuration.
pub fn load_source_pages(config: &PipelineConfig) -> Result<Vec<Vec<RawPage>>> {
    config
        .sources
        .iter()
        .map(|source| -> Result<Vec<RawPage>> {
            let path = source.pages.as_ref().ok_or_else(|| {
                PipelineError::config(&source.id, "no `pages` file configured")
            })?;
            let pages = load_pages(path)
                .with_context(|| format!("failed to load pages for source '{}'", source.id))?;
            tracing::debug!(source = %source.id, pages = pages.len(), "loaded pages");
            Ok(pages)
        })
        .collect()
}

pub fn run_pipeline(config: &PipelineConfig) -> Result<RunOutput> {
    validate_sources(&config.sources)?;
    let pages = load_source_pages(config)?;
    let run = build_run(config, &pages)?;
    export_run(&run, &config.output)
        .with_context(|| format!("failed to export to {}", config.output.display()))?;
    Ok(run)
}

pub fn export_run(run: &RunOutput, output: &Path) -> Result<()> {
    let json_exporter = JsonExporter::new(output.to_path_buf());
    json_exporter.export(run)?;

    let text_exporter = TextExporter::new(output.to_path_buf());
    text_exporter.export(run)?;

    let html_exporter = HtmlReviewExporter::new(output.to_path_buf());
    html_exporter.export(run)?;

    Ok(())
}
