use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One page of text as handed over by the OCR collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawPage {
    #[serde(alias = "document")]
    pub source: String,
    #[serde(alias = "page")]
    pub page_idx: usize,
    pub text: String,
}

impl RawPage {
    pub fn new(source: impl Into<String>, page_idx: usize, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            page_idx,
            text: text.into(),
        }
    }
}

/// Physical layout of a source dictionary. Chosen by configuration, never
/// inferred from page content.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Starred,
    Hanging,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TokenRole {
    Headword,
    Variant,
    PartOfSpeech,
    Label,
    Gloss,
    Example,
    CrossReference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub role: TokenRole,
    pub page: usize,
    /// Last page the text was taken from; differs from `page` only for
    /// tokens stitched across a page break.
    pub last_page: usize,
    pub line: usize,
    /// Indentation of the token's line, measured inside its layout column.
    pub column: usize,
    /// Continues the previous token's field (wrapped line) instead of
    /// opening a new one.
    pub joins_previous: bool,
    /// Example text whose closing bracket comes on a later line.
    pub unclosed: bool,
}

impl Token {
    pub fn new(
        text: impl Into<String>,
        role: TokenRole,
        page: usize,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            text: text.into(),
            role,
            page,
            last_page: page,
            line,
            column,
            joins_previous: false,
            unclosed: false,
        }
    }

    pub fn joined(mut self) -> Self {
        self.joins_previous = true;
        self
    }

    /// Copy of this token carrying a different role.
    pub fn retagged(&self, role: TokenRole) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }

    pub fn is_headword_candidate(&self) -> bool {
        self.role == TokenRole::Headword
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySpan {
    pub source: String,
    pub layout: LayoutKind,
    pub tokens: Vec<Token>,
}

impl EntrySpan {
    pub fn new(source: impl Into<String>, layout: LayoutKind) -> Self {
        Self {
            source: source.into(),
            layout,
            tokens: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn headword_token(&self) -> Option<&Token> {
        self.tokens.iter().find(|token| token.is_headword_candidate())
    }

    pub fn page_range(&self) -> Option<(usize, usize)> {
        let start = self.tokens.iter().map(|token| token.page).min()?;
        let end = self.tokens.iter().map(|token| token.last_page).max()?;
        Some((start, end))
    }

    /// Page and line of the first token, used to attribute diagnostics.
    pub fn origin(&self) -> Option<(usize, usize)> {
        self.tokens.first().map(|token| (token.page, token.line))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Particle,
    #[default]
    Unknown,
}

impl PartOfSpeech {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartOfSpeech::Noun => "noun",
            PartOfSpeech::Verb => "verb",
            PartOfSpeech::Adjective => "adjective",
            PartOfSpeech::Particle => "particle",
            PartOfSpeech::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GlossLanguage {
    En,
    Ar,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sense {
    pub gloss: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<GlossLanguage>,
}

/// A "see X" pointer. Extraction produces only `Unresolved` surfaces; the
/// resolver turns the ones it can match into `Resolved` identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CrossReference {
    Resolved(String),
    Unresolved { unresolved: String },
}

impl CrossReference {
    pub fn unresolved(surface: impl Into<String>) -> Self {
        Self::Unresolved {
            unresolved: surface.into(),
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            CrossReference::Resolved(id) => Some(id),
            CrossReference::Unresolved { .. } => None,
        }
    }

    pub fn surface(&self) -> Option<&str> {
        match self {
            CrossReference::Resolved(_) => None,
            CrossReference::Unresolved { unresolved } => Some(unresolved),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Region {
    #[serde(rename = "Er")]
    Eritrea,
    #[serde(rename = "Su")]
    Sudan,
    #[serde(rename = "Eg")]
    Egypt,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    #[serde(rename = "m")]
    Masculine,
    #[serde(rename = "f")]
    Feminine,
    #[serde(rename = "mf")]
    Common,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Origin {
    #[serde(rename = "Cush")]
    Cushitic,
    #[serde(rename = "Sem")]
    Semitic,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryProvenance {
    pub document: String,
    pub page_start: usize,
    pub page_end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DictionaryEntry {
    pub id: String,
    pub headword: String,
    #[serde(default)]
    pub variants: BTreeSet<String>,
    #[serde(default)]
    pub part_of_speech: PartOfSpeech,
    pub senses: Vec<Sense>,
    #[serde(default)]
    pub cross_references: Vec<CrossReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<Region>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    pub provenance: EntryProvenance,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

impl DictionaryEntry {
    pub fn mark(&mut self, issue: impl Into<String>) {
        let issue = issue.into();
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CorpusMetadata {
    pub sources: Vec<SourceInfo>,
    pub generated_at: String,
}

/// The persisted artifact: entries keyed by identifier. A `BTreeMap` keeps
/// key order stable so identical input serializes identically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Corpus {
    pub metadata: CorpusMetadata,
    pub entries: BTreeMap<String, DictionaryEntry>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&DictionaryEntry> {
        self.entries.get(id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(data: &str) -> serde_json::Result<Self> {
        serde_json::from_str(data)
    }
}
