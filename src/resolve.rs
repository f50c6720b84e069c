//! Cross-reference resolution over the complete entry set of one source.

use std::collections::BTreeMap;

use crate::config::MarkerConfig;
use crate::core::diagnostics::{DiagnosticContext, RunContext, Stage};
use crate::core::model::{CrossReference, DictionaryEntry};
use crate::layout::markers::MarkerTable;

/// Lookup key shared by headwords, variants and reference targets:
/// lowercase, surrounding punctuation and a trailing `/t` removed,
/// whitespace collapsed.
pub fn normalize_key(text: &str) -> String {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    let joined = words.join(" ");
    let trimmed = joined.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '/');
    let trimmed = trimmed.strip_suffix("/t").unwrap_or(trimmed);
    trimmed
        .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
        .to_string()
}

#[derive(Debug, Default)]
struct EntryIndex {
    headwords: BTreeMap<String, Vec<String>>,
    variants: BTreeMap<String, Vec<String>>,
}

impl EntryIndex {
    fn build(entries: &[DictionaryEntry]) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index
                .headwords
                .entry(normalize_key(&entry.headword))
                .or_default()
                .push(entry.id.clone());
            for variant in &entry.variants {
                let ids = index.variants.entry(normalize_key(variant)).or_default();
                if !ids.contains(&entry.id) {
                    ids.push(entry.id.clone());
                }
            }
        }
        index
    }

    /// Headword matches win over variant matches; ids come back in source
    /// order.
    fn lookup(&self, key: &str) -> Option<&[String]> {
        self.headwords
            .get(key)
            .or_else(|| self.variants.get(key))
            .map(Vec::as_slice)
            .filter(|ids| !ids.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct CrossReferenceResolver {
    markers: MarkerTable,
}

impl CrossReferenceResolver {
    pub fn new(markers: &MarkerConfig) -> Self {
        Self {
            markers: MarkerTable::new(markers),
        }
    }

    /// Target text of a surface string with its marker removed.
    pub fn target_key(&self, surface: &str) -> String {
        let surface = surface.trim();
        let target = match self.markers.cross_reference_prefix(surface) {
            Some(len) => &surface[len..],
            None => surface,
        };
        normalize_key(target)
    }

    /// Rewrites every matching reference to its target's identifier.
    /// Entries must be in source order: ambiguous targets resolve to the
    /// earliest entry.
    pub fn resolve(&self, entries: &mut [DictionaryEntry], run: &mut RunContext) {
        let index = EntryIndex::build(entries);
        let mut resolved = 0usize;
        let mut unresolved = 0usize;

        for entry in entries.iter_mut() {
            for reference in entry.cross_references.iter_mut() {
                let Some(surface) = reference.surface().map(str::to_string) else {
                    continue;
                };
                let key = self.target_key(&surface);
                let context = DiagnosticContext::entry(&entry.id);
                match index.lookup(&key) {
                    Some(ids) => {
                        if ids.len() > 1 {
                            run.warn(
                                Stage::Resolve,
                                context,
                                format!(
                                    "cross-reference '{surface}' is ambiguous between {}; using '{}'",
                                    ids.join(", "),
                                    ids[0]
                                ),
                            );
                        }
                        *reference = CrossReference::Resolved(ids[0].clone());
                        resolved += 1;
                    }
                    None => {
                        run.warn(
                            Stage::Resolve,
                            context,
                            format!("unresolved cross-reference '{surface}'"),
                        );
                        unresolved += 1;
                    }
                }
            }
        }

        tracing::info!(source = run.source(), resolved, unresolved, "resolved cross-references");
    }
}
