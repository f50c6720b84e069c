//! Per-source layout configuration.
//!
//! Each source names its layout explicitly (`kind = "starred"` or
//! `kind = "hanging"`); any field left out of the TOML falls back to the
//! defaults learned from the two printed dictionaries.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::PipelineError;
use crate::core::model::{Gender, LayoutKind, Origin, PartOfSpeech, Region};
use crate::normalize::CompiledFurniture;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FurnitureRule {
    pub pattern: String,
    pub confidence: f32,
}

impl FurnitureRule {
    pub fn new(pattern: &str, confidence: f32) -> Self {
        Self {
            pattern: pattern.to_string(),
            confidence,
        }
    }
}

/// Page furniture (running heads, page numbers) to strip before tokenizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FurnitureConfig {
    pub rules: Vec<FurnitureRule>,
    pub threshold: f32,
}

impl Default for FurnitureConfig {
    fn default() -> Self {
        Self {
            rules: vec![
                // "33", "(33)", "٣٣", "— 12", "2)"
                FurnitureRule::new(
                    r"^\s*[-–—]*\s*[\(\[\{]?\s*[0-9٠-٩۰-۹]{1,4}\s*[\)\]\}]?\s*[\.:\-–—]?\s*$",
                    0.95,
                ),
                FurnitureRule::new(r"^\s*#", 0.9),
            ],
            threshold: 0.8,
        }
    }
}

impl FurnitureConfig {
    pub fn with_rule(mut self, pattern: &str, confidence: f32) -> Self {
        self.rules.push(FurnitureRule::new(pattern, confidence));
        self
    }
}

/// Marker glyphs of one layout: the abbreviation tables plus the OCR
/// misreadings known for them.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarkerConfig {
    pub part_of_speech: BTreeMap<String, PartOfSpeech>,
    pub regions: BTreeMap<String, Region>,
    pub genders: BTreeMap<String, Gender>,
    pub origins: BTreeMap<String, Origin>,
    pub corrections: BTreeMap<String, String>,
    pub cross_reference: Vec<String>,
    pub fuzzy_threshold: f64,
}

/// A `markers` table as written in TOML. Fields left out keep the value of
/// the layout's own preset.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MarkerOverrides {
    part_of_speech: Option<BTreeMap<String, PartOfSpeech>>,
    regions: Option<BTreeMap<String, Region>>,
    genders: Option<BTreeMap<String, Gender>>,
    origins: Option<BTreeMap<String, Origin>>,
    corrections: Option<BTreeMap<String, String>>,
    cross_reference: Option<Vec<String>>,
    fuzzy_threshold: Option<f64>,
}

impl MarkerOverrides {
    fn apply(self, base: MarkerConfig) -> MarkerConfig {
        MarkerConfig {
            part_of_speech: self.part_of_speech.unwrap_or(base.part_of_speech),
            regions: self.regions.unwrap_or(base.regions),
            genders: self.genders.unwrap_or(base.genders),
            origins: self.origins.unwrap_or(base.origins),
            corrections: self.corrections.unwrap_or(base.corrections),
            cross_reference: self.cross_reference.unwrap_or(base.cross_reference),
            fuzzy_threshold: self.fuzzy_threshold.unwrap_or(base.fuzzy_threshold),
        }
    }
}

fn starred_markers<'de, D>(deserializer: D) -> Result<MarkerConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(MarkerOverrides::deserialize(deserializer)?.apply(MarkerConfig::starred()))
}

fn hanging_markers<'de, D>(deserializer: D) -> Result<MarkerConfig, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(MarkerOverrides::deserialize(deserializer)?.apply(MarkerConfig::hanging()))
}

fn table<V: Copy>(pairs: &[(&str, V)]) -> BTreeMap<String, V> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

impl MarkerConfig {
    pub fn starred() -> Self {
        use PartOfSpeech::*;
        Self {
            part_of_speech: table(&[
                ("Adj", Adjective),
                ("Adv", Particle),
                ("Con", Particle),
                ("Dem", Unknown),
                ("Intj", Particle),
                ("N", Noun),
                ("Num", Unknown),
                ("Phr", Unknown),
                ("Pps", Particle),
                ("Pron", Unknown),
                ("V", Verb),
            ]),
            regions: table(&[
                ("Er", Region::Eritrea),
                ("Su", Region::Sudan),
                ("Eg", Region::Egypt),
            ]),
            genders: table(&[
                ("m", Gender::Masculine),
                ("f", Gender::Feminine),
                ("mf", Gender::Common),
            ]),
            origins: table(&[("Cush", Origin::Cushitic), ("Sem", Origin::Semitic)]),
            corrections: [("Ady", "Adv")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            cross_reference: vec!["see".into(), "cf.".into(), "cf".into(), "=".into()],
            fuzzy_threshold: 0.66,
        }
    }

    pub fn hanging() -> Self {
        use PartOfSpeech::*;
        Self {
            part_of_speech: table(&[
                ("n.", Noun),
                ("nm.", Noun),
                ("nf.", Noun),
                ("ag.", Noun),
                ("v.", Verb),
                ("vm.", Verb),
                ("vn.", Verb),
                ("v.w.", Verb),
                ("v.s.", Verb),
                ("act.", Unknown),
                ("adj.", Adjective),
                ("adv.", Particle),
                ("conj.", Particle),
                ("interj.", Particle),
                ("pp.", Particle),
            ]),
            regions: table(&[
                ("Er", Region::Eritrea),
                ("Su", Region::Sudan),
                ("Eg", Region::Egypt),
            ]),
            genders: table(&[
                ("nm.", Gender::Masculine),
                ("nf.", Gender::Feminine),
                ("m.", Gender::Masculine),
                ("f.", Gender::Feminine),
            ]),
            origins: BTreeMap::new(),
            corrections: [("v.s5", "v.s."), ("u.", "v."), ("adj,", "adj.")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            cross_reference: vec![
                "see".into(),
                "cf.".into(),
                "cf".into(),
                "=".into(),
                "var. of".into(),
            ],
            fuzzy_threshold: 0.66,
        }
    }
}

/// Beja → English/Arabic dictionary: `*`-separated fields, possibly set in
/// several columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StarredLayout {
    /// Character offsets at which a physical line is cut into columns.
    pub column_boundaries: Vec<usize>,
    pub headword_max_indent: usize,
    pub never_headwords: BTreeSet<String>,
    #[serde(deserialize_with = "starred_markers")]
    pub markers: MarkerConfig,
}

impl Default for StarredLayout {
    fn default() -> Self {
        Self {
            column_boundaries: Vec::new(),
            headword_max_indent: 1,
            never_headwords: [
                "sg", "pl", "pl.", "m", "f", "mf", "m.", "f.", "-", "—", "_", "=",
                // English words that show up at the start of wrapped gloss lines
                "woman", "women", "man", "men", "boy", "girl", "the", "a", "an", "of", "and",
                "or", "to", "from", "with", "in", "on", "at", "most", "time", "anyway",
                "usually", "only", "maturity", "health", "custom", "culture", "other",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            markers: MarkerConfig::starred(),
        }
    }
}

/// Single-column dictionary with hanging indents: headword at the margin,
/// wrapped lines indented.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HangingLayout {
    pub headword_max_indent: usize,
    pub bad_headwords: BTreeSet<String>,
    pub continuation_prefixes: Vec<String>,
    #[serde(deserialize_with = "hanging_markers")]
    pub markers: MarkerConfig,
}

impl Default for HangingLayout {
    fn default() -> Self {
        Self {
            headword_max_indent: 1,
            bad_headwords: [
                "def", "def.", "sg", "pl", "adv", "adj", "n", "v", "cf", "eg", "er", "su", "m",
                "f", "mf", "act", "agent", "one", "the", "and", "or", "of", "to",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            continuation_prefixes: ["def.", "cf", "sg.", "pl.", "see", "also"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            markers: MarkerConfig::hanging(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayoutConfig {
    Starred(StarredLayout),
    Hanging(HangingLayout),
}

impl LayoutConfig {
    pub fn kind(&self) -> LayoutKind {
        match self {
            LayoutConfig::Starred(_) => LayoutKind::Starred,
            LayoutConfig::Hanging(_) => LayoutKind::Hanging,
        }
    }

    pub fn markers(&self) -> &MarkerConfig {
        match self {
            LayoutConfig::Starred(layout) => &layout.markers,
            LayoutConfig::Hanging(layout) => &layout.markers,
        }
    }
}

/// Names of the run-level files written next to the per-source corpora.
const RESERVED_SOURCE_IDS: &[&str] = &["corpus", "diagnostics", "review"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// RawPage JSON Lines produced by the OCR collaborator for this source.
    #[serde(default)]
    pub pages: Option<PathBuf>,
    pub layout: LayoutConfig,
    #[serde(default)]
    pub furniture: FurnitureConfig,
}

impl SourceConfig {
    pub fn new(id: &str, name: &str, layout: LayoutConfig) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            pages: None,
            layout,
            furniture: FurnitureConfig::default(),
        }
    }

    pub fn beja_arabic_english() -> Self {
        let mut config = Self::new(
            "beja-arabic",
            "Beja-Arabic-English Dictionary",
            LayoutConfig::Starred(StarredLayout::default()),
        );
        config.furniture = FurnitureConfig::default()
            .with_rule(r"(?i)^\s*beja\s*[-–—]\s*(arabic|english)", 0.9);
        config
    }

    pub fn beja_english_hanging() -> Self {
        Self::new(
            "beja-english",
            "Beja-English Dictionary",
            LayoutConfig::Hanging(HangingLayout::default()),
        )
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        let id = self.id.as_str();
        if id.is_empty() {
            return Err(PipelineError::config("<unnamed>", "source id must not be empty"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PipelineError::config(
                id,
                "source id may only contain ASCII letters, digits, '-' and '_'",
            ));
        }

        if RESERVED_SOURCE_IDS.contains(&id) {
            return Err(PipelineError::config(
                id,
                "source id collides with an output file name",
            ));
        }

        CompiledFurniture::new(&self.furniture, id)?;

        let markers = self.layout.markers();
        if markers.part_of_speech.is_empty() {
            return Err(PipelineError::config(id, "part-of-speech marker table is empty"));
        }
        if markers.cross_reference.is_empty() {
            return Err(PipelineError::config(id, "cross-reference marker list is empty"));
        }
        if !(0.0..=1.0).contains(&markers.fuzzy_threshold) {
            return Err(PipelineError::config(
                id,
                format!("fuzzy threshold {} outside [0, 1]", markers.fuzzy_threshold),
            ));
        }
        for (from, to) in &markers.corrections {
            if !markers.part_of_speech.contains_key(to)
                && !markers.regions.contains_key(to)
                && !markers.genders.contains_key(to)
                && !markers.origins.contains_key(to)
            {
                return Err(PipelineError::config(
                    id,
                    format!("correction '{from}' -> '{to}' targets an unknown marker"),
                ));
            }
        }

        if let LayoutConfig::Starred(layout) = &self.layout {
            if layout
                .column_boundaries
                .windows(2)
                .any(|pair| pair[0] >= pair[1])
                || layout.column_boundaries.first() == Some(&0)
            {
                return Err(PipelineError::config(
                    id,
                    format!(
                        "column boundaries must be positive and strictly increasing: {:?}",
                        layout.column_boundaries
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn default_merge() -> bool {
    true
}

/// Top-level TOML document: the sources of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default = "default_merge")]
    pub merge: bool,
    #[serde(rename = "source")]
    pub sources: Vec<SourceConfig>,
}

impl ConfigFile {
    pub fn from_toml_str(data: &str) -> Result<Self> {
        let config: ConfigFile = toml::from_str(data).context("failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a config file; relative `pages` paths are taken relative to it.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config = Self::from_toml_str(&data)
            .with_context(|| format!("invalid config {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for source in &mut config.sources {
            if let Some(pages) = &source.pages {
                if pages.is_relative() {
                    source.pages = Some(base.join(pages));
                }
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_sources(&self.sources)
    }
}

pub fn validate_sources(sources: &[SourceConfig]) -> Result<(), PipelineError> {
    if sources.is_empty() {
        return Err(PipelineError::config("<none>", "no sources configured"));
    }
    let mut seen = BTreeSet::new();
    for source in sources {
        source.validate()?;
        if !seen.insert(source.id.as_str()) {
            return Err(PipelineError::config(&source.id, "duplicate source id"));
        }
    }
    Ok(())
}
