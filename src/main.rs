use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bejadict::config::ConfigFile;
use bejadict::core::model::Corpus;
use bejadict::coverage::coverage;
use bejadict::export::text_export::format_entry;
use bejadict::lookup::{lookup, LookupOptions};
use bejadict::pipeline::{run_pipeline, PipelineConfig};
use bejadict::Severity;

#[derive(Parser, Debug)]
#[command(name = "bejadict")]
#[command(version, about = "Structure OCR text of Beja bilingual dictionaries into a JSON corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the corpus from the page files named in a config
    Build {
        /// Pipeline configuration (TOML)
        config: PathBuf,

        /// Output directory (default: ./corpus_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip the merged corpus.json
        #[arg(long)]
        no_merge: bool,
    },

    /// Validate a config and list its sources
    Check {
        /// Pipeline configuration (TOML)
        config: PathBuf,
    },

    /// Fuzzy headword lookup in a corpus JSON file
    Lookup {
        corpus: PathBuf,

        query: String,

        #[arg(short = 'k', long, default_value_t = 10)]
        top_k: usize,

        /// Minimum score (0-100)
        #[arg(long, default_value_t = 60.0)]
        min_score: f64,

        /// Search variants and glosses too
        #[arg(long)]
        all: bool,
    },

    /// Compare headword coverage between the sources of a corpus
    Coverage { corpus: PathBuf },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bejadict=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            output,
            no_merge,
        } => build(config, output, no_merge),
        Commands::Check { config } => check(config),
        Commands::Lookup {
            corpus,
            query,
            top_k,
            min_score,
            all,
        } => run_lookup(
            corpus,
            &query,
            LookupOptions {
                top_k,
                min_score,
                all_fields: all,
            },
        ),
        Commands::Coverage { corpus } => run_coverage(corpus),
    }
}

/// `SOURCE_DATE_EPOCH` when set, so rebuilds are byte-identical.
fn generation_time() -> Result<DateTime<Utc>> {
    match std::env::var("SOURCE_DATE_EPOCH") {
        Ok(value) => {
            let secs: i64 = value
                .trim()
                .parse()
                .with_context(|| format!("SOURCE_DATE_EPOCH is not a number: {value}"))?;
            DateTime::from_timestamp(secs, 0)
                .with_context(|| format!("SOURCE_DATE_EPOCH out of range: {value}"))
        }
        Err(_) => Ok(Utc::now()),
    }
}

fn build(config_path: PathBuf, output: Option<PathBuf>, no_merge: bool) -> Result<()> {
    let file = ConfigFile::load(&config_path)?;
    let output_dir = output.unwrap_or_else(|| PathBuf::from("corpus_output"));

    println!("[*] Config: {}", config_path.display());
    println!("[*] Output: {}", output_dir.display());

    let mut config = PipelineConfig::from_file(file, output_dir.clone(), generation_time()?);
    if no_merge {
        config.merge = false;
    }

    println!("\n[+] Building {} source(s)...", config.sources.len());
    let run = run_pipeline(&config)
        .with_context(|| format!("Failed to build corpus from: {}", config_path.display()))?;

    for source in &run.sources {
        println!(
            "  {}: {} entries, {} diagnostic(s)",
            source.info.id,
            source.corpus.len(),
            source.diagnostics.len()
        );
    }
    if let Some(merged) = &run.merged {
        println!("  merged: {} entries", merged.len());
    }
    println!(
        "\n[*] Diagnostics: {} error(s), {} warning(s), {} info",
        run.count(Severity::Error),
        run.count(Severity::Warning),
        run.count(Severity::Info)
    );
    println!("[✓] Done! Results saved to: {}", output_dir.display());
    Ok(())
}

fn check(config_path: PathBuf) -> Result<()> {
    let file = ConfigFile::load(&config_path)?;
    println!("Configuration");
    println!("=============");
    println!("File: {}", config_path.display());
    println!("Merge: {}", file.merge);
    for source in &file.sources {
        let pages = source
            .pages
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} ({}): {:?} layout, pages {}",
            source.id,
            source.display_name(),
            source.layout.kind(),
            pages
        );
    }
    println!("[✓] Configuration is valid");
    Ok(())
}

fn load_corpus(path: &Path) -> Result<Corpus> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus: {}", path.display()))?;
    Corpus::from_json(&data).with_context(|| format!("Invalid corpus JSON: {}", path.display()))
}

fn run_lookup(corpus_path: PathBuf, query: &str, options: LookupOptions) -> Result<()> {
    let corpus = load_corpus(&corpus_path)?;
    let hits = lookup(&corpus, query, &options);
    if hits.is_empty() {
        println!("No matches for '{query}' (min score {})", options.min_score);
        return Ok(());
    }
    for hit in hits {
        println!("[score {:.1}] {}", hit.score, format_entry(hit.entry));
    }
    Ok(())
}

fn run_coverage(corpus_path: PathBuf) -> Result<()> {
    let corpus = load_corpus(&corpus_path)?;
    let report = coverage(&corpus);
    for source in &report.sources {
        println!(
            "{}: total={} | shared={} | in_all_others={} | exclusive={}",
            source.source,
            source.total,
            source.shared,
            source.in_all_others,
            source.exclusive.len()
        );
    }
    println!("common to all: {}", report.common_to_all);
    println!("union: {}", report.union);
    Ok(())
}
