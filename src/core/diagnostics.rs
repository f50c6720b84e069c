use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Normalize,
    Tokenize,
    Segment,
    Extract,
    Resolve,
    Validate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,
}

impl DiagnosticContext {
    pub fn page(page: usize) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub fn at(page: usize, line: usize) -> Self {
        Self {
            page: Some(page),
            line: Some(line),
            entry: None,
        }
    }

    pub fn entry(id: impl Into<String>) -> Self {
        Self {
            entry: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn with_entry(mut self, id: impl Into<String>) -> Self {
        self.entry = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    pub source: String,
    pub context: DiagnosticContext,
    pub message: String,
    pub severity: Severity,
}

/// State owned by one pipeline run over one source: the ordered diagnostics
/// stream and the identifiers handed out so far. Passed explicitly through
/// every stage so runs over different sources never share anything.
#[derive(Debug, Clone)]
pub struct RunContext {
    source: String,
    diagnostics: Vec<Diagnostic>,
    used_ids: BTreeSet<String>,
}

impl RunContext {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            diagnostics: Vec::new(),
            used_ids: BTreeSet::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn info(&mut self, stage: Stage, context: DiagnosticContext, message: impl Into<String>) {
        self.record(Severity::Info, stage, context, message);
    }

    pub fn warn(&mut self, stage: Stage, context: DiagnosticContext, message: impl Into<String>) {
        self.record(Severity::Warning, stage, context, message);
    }

    pub fn error(&mut self, stage: Stage, context: DiagnosticContext, message: impl Into<String>) {
        self.record(Severity::Error, stage, context, message);
    }

    pub fn record(
        &mut self,
        severity: Severity,
        stage: Stage,
        context: DiagnosticContext,
        message: impl Into<String>,
    ) {
        let message = message.into();
        match severity {
            Severity::Info => {
                tracing::debug!(source = %self.source, ?stage, ?context, "{message}")
            }
            Severity::Warning => {
                tracing::warn!(source = %self.source, ?stage, ?context, "{message}")
            }
            Severity::Error => {
                tracing::error!(source = %self.source, ?stage, ?context, "{message}")
            }
        }
        self.diagnostics.push(Diagnostic {
            stage,
            source: self.source.clone(),
            context,
            message,
            severity,
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == severity)
            .count()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Identifier for the next entry with this headword: the slug itself for
    /// the first occurrence, then `-2`, `-3`, ... in source order.
    pub fn allocate_id(&mut self, headword: &str) -> String {
        let base = slugify(headword);
        let mut candidate = base.clone();
        let mut n = 1;
        while self.used_ids.contains(&candidate) {
            n += 1;
            candidate = format!("{base}-{n}");
        }
        self.used_ids.insert(candidate.clone());
        candidate
    }
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '\'' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "entry".to_string()
    } else {
        slug
    }
}
