//! Headword coverage comparison between the sources of a corpus.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::core::model::Corpus;
use crate::resolve::normalize_key;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceCoverage {
    pub source: String,
    /// Distinct normalized headwords.
    pub total: usize,
    /// Headwords also found in at least one other source.
    pub shared: usize,
    /// Headwords found in every other source.
    pub in_all_others: usize,
    pub exclusive: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub sources: Vec<SourceCoverage>,
    pub common_to_all: usize,
    pub union: usize,
}

/// Normalized headwords of the corpus grouped by the source they came from.
pub fn headword_sets(corpus: &Corpus) -> BTreeMap<String, BTreeSet<String>> {
    let mut sets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for source in &corpus.metadata.sources {
        sets.entry(source.id.clone()).or_default();
    }
    for entry in corpus.entries.values() {
        let key = normalize_key(&entry.headword);
        if key.is_empty() {
            continue;
        }
        sets.entry(entry.provenance.document.clone())
            .or_default()
            .insert(key);
    }
    sets
}

pub fn compare(sets: &BTreeMap<String, BTreeSet<String>>) -> CoverageReport {
    let mut sources = Vec::with_capacity(sets.len());
    for (name, words) in sets {
        let others: Vec<&BTreeSet<String>> = sets
            .iter()
            .filter(|(other, _)| *other != name)
            .map(|(_, set)| set)
            .collect();
        let in_any = |word: &String| others.iter().any(|set| set.contains(word));
        let in_all =
            |word: &String| !others.is_empty() && others.iter().all(|set| set.contains(word));

        sources.push(SourceCoverage {
            source: name.clone(),
            total: words.len(),
            shared: words.iter().filter(|word| in_any(*word)).count(),
            in_all_others: words.iter().filter(|word| in_all(*word)).count(),
            exclusive: words.iter().filter(|word| !in_any(*word)).cloned().collect(),
        });
    }

    let union: BTreeSet<&String> = sets.values().flatten().collect();
    let common_to_all = match sets.values().next() {
        Some(first) => first
            .iter()
            .filter(|word| sets.values().all(|set| set.contains(*word)))
            .count(),
        None => 0,
    };

    CoverageReport {
        sources,
        common_to_all,
        union: union.len(),
    }
}

pub fn coverage(corpus: &Corpus) -> CoverageReport {
    compare(&headword_sets(corpus))
}
