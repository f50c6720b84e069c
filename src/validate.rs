//! Schema validation, corpus assembly and the cross-source merge.
//!
//! Content problems are marked on the entry and reported as diagnostics;
//! only violated structural invariants (which mean a bug upstream) come back
//! as `PipelineError::Structural` and abort the run.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::diagnostics::{DiagnosticContext, RunContext, Stage};
use crate::core::error::PipelineError;
use crate::core::model::{
    Corpus, CorpusMetadata, CrossReference, DictionaryEntry, SourceInfo,
};
use crate::resolve::normalize_key;

pub const LETTER_JUMP_ISSUE: &str = "implausible-letter-jump";
pub const UNRESOLVED_ISSUE: &str = "unresolved-cross-reference";

/// Consecutive out-of-order headwords after which the order check accepts
/// the new initial letter.
const RESYNC_AFTER: usize = 10;

fn first_initial(headword: &str) -> Option<char> {
    normalize_key(headword)
        .chars()
        .find(|c| c.is_ascii_lowercase())
}

fn next_letter(c: char) -> Option<char> {
    match c {
        'a'..='y' => char::from_u32(c as u32 + 1),
        _ => None,
    }
}

/// Dictionaries are alphabetical: a headword whose initial is neither the
/// current letter nor the next one is probably misread.
fn check_alphabetical_order(entries: &mut [DictionaryEntry], run: &mut RunContext) {
    let mut current: Option<char> = None;
    let mut jumps = 0usize;

    for entry in entries.iter_mut() {
        let Some(initial) = first_initial(&entry.headword) else {
            continue;
        };
        let Some(last) = current else {
            current = Some(initial);
            continue;
        };
        if initial == last || Some(initial) == next_letter(last) {
            current = Some(initial);
            jumps = 0;
            continue;
        }

        jumps += 1;
        if jumps >= RESYNC_AFTER {
            run.info(
                Stage::Validate,
                DiagnosticContext::entry(&entry.id),
                format!("alphabetical order resynchronised at '{}' ({initial})", entry.headword),
            );
            current = Some(initial);
            jumps = 0;
            continue;
        }
        entry.mark(LETTER_JUMP_ISSUE);
        run.warn(
            Stage::Validate,
            DiagnosticContext::entry(&entry.id),
            format!(
                "headword '{}' jumps from '{last}' to '{initial}'",
                entry.headword
            ),
        );
    }
}

fn check_entry(entry: &DictionaryEntry, source: &str) -> Result<(), PipelineError> {
    if entry.id.is_empty() {
        return Err(PipelineError::structural(format!(
            "entry '{}' from {source} has an empty identifier",
            entry.headword
        )));
    }
    if entry.headword.trim().is_empty() {
        return Err(PipelineError::structural(format!(
            "entry '{}' has an empty headword",
            entry.id
        )));
    }
    if entry.senses.is_empty() || entry.senses.iter().any(|sense| sense.gloss.trim().is_empty()) {
        return Err(PipelineError::structural(format!(
            "entry '{}' has no sense or an empty gloss",
            entry.id
        )));
    }
    if entry.provenance.document != source {
        return Err(PipelineError::structural(format!(
            "entry '{}' claims document '{}' inside source '{source}'",
            entry.id, entry.provenance.document
        )));
    }
    if entry.provenance.page_start > entry.provenance.page_end {
        return Err(PipelineError::structural(format!(
            "entry '{}' has page range {}-{}",
            entry.id, entry.provenance.page_start, entry.provenance.page_end
        )));
    }
    Ok(())
}

/// Validates the resolved entries of one source, in source order.
pub fn validate_source(
    entries: &mut [DictionaryEntry],
    run: &mut RunContext,
) -> Result<(), PipelineError> {
    let source = run.source().to_string();
    let mut seen = BTreeSet::new();
    for entry in entries.iter() {
        check_entry(entry, &source)?;
        if !seen.insert(entry.id.as_str()) {
            return Err(PipelineError::structural(format!(
                "duplicate identifier '{}' in source {source}",
                entry.id
            )));
        }
    }

    check_alphabetical_order(entries, run);

    for entry in entries.iter_mut() {
        if entry
            .cross_references
            .iter()
            .any(|reference| reference.surface().is_some())
        {
            entry.mark(UNRESOLVED_ISSUE);
        }
    }
    Ok(())
}

/// Every resolved reference must name an entry of the same corpus.
pub fn check_closure(corpus: &Corpus) -> Result<(), PipelineError> {
    for entry in corpus.entries.values() {
        for target in entry.cross_references.iter().filter_map(CrossReference::target) {
            if !corpus.entries.contains_key(target) {
                return Err(PipelineError::structural(format!(
                    "entry '{}' references missing identifier '{target}'",
                    entry.id
                )));
            }
        }
    }
    Ok(())
}

/// Corpus of a single source.
pub fn build_corpus(
    info: SourceInfo,
    entries: Vec<DictionaryEntry>,
    generated_at: &str,
) -> Result<Corpus, PipelineError> {
    let mut map = BTreeMap::new();
    for entry in entries {
        if let Some(previous) = map.insert(entry.id.clone(), entry) {
            return Err(PipelineError::structural(format!(
                "duplicate identifier '{}' in source {}",
                previous.id, info.id
            )));
        }
    }
    let corpus = Corpus {
        metadata: CorpusMetadata {
            sources: vec![info],
            generated_at: generated_at.to_string(),
        },
        entries: map,
    };
    check_closure(&corpus)?;
    Ok(corpus)
}

/// Merges per-source corpora in the given order. The first source keeps
/// its identifiers; a later source's colliding identifier becomes
/// `{id}@{source}` and that source's references follow the rename.
pub fn merge_corpora(
    corpora: &[Corpus],
    generated_at: &str,
    run: &mut RunContext,
) -> Result<Corpus, PipelineError> {
    let mut merged: BTreeMap<String, DictionaryEntry> = BTreeMap::new();
    let mut sources = Vec::new();

    for corpus in corpora {
        let source_id = corpus
            .metadata
            .sources
            .first()
            .map(|info| info.id.clone())
            .ok_or_else(|| PipelineError::structural("per-source corpus without source info"))?;
        sources.extend(corpus.metadata.sources.iter().cloned());

        let renames: BTreeMap<String, String> = corpus
            .entries
            .keys()
            .filter(|id| merged.contains_key(*id))
            .map(|id| (id.clone(), format!("{id}@{source_id}")))
            .collect();
        for (from, to) in &renames {
            run.info(
                Stage::Validate,
                DiagnosticContext::entry(from),
                format!("identifier '{from}' from {source_id} renamed to '{to}'"),
            );
        }

        for entry in corpus.entries.values() {
            let mut entry = entry.clone();
            if let Some(renamed) = renames.get(&entry.id) {
                entry.id = renamed.clone();
            }
            for reference in entry.cross_references.iter_mut() {
                if let CrossReference::Resolved(target) = reference {
                    if let Some(renamed) = renames.get(target.as_str()) {
                        *target = renamed.clone();
                    }
                }
            }
            if merged.contains_key(&entry.id) {
                return Err(PipelineError::structural(format!(
                    "identifier '{}' still collides after disambiguation",
                    entry.id
                )));
            }
            merged.insert(entry.id.clone(), entry);
        }
    }

    let corpus = Corpus {
        metadata: CorpusMetadata {
            sources,
            generated_at: generated_at.to_string(),
        },
        entries: merged,
    };
    check_closure(&corpus)?;
    tracing::info!(entries = corpus.len(), sources = corpora.len(), "merged corpus");
    Ok(corpus)
}
