//! Fuzzy headword search over a persisted corpus.

use std::cmp::Ordering;

use strsim::normalized_levenshtein;

use crate::core::model::{Corpus, DictionaryEntry};
use crate::resolve::normalize_key;

#[derive(Debug, Clone)]
pub struct LookupOptions {
    pub top_k: usize,
    /// Minimum score in `0..=100`.
    pub min_score: f64,
    /// Also match variants and glosses, not just the headword.
    pub all_fields: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            min_score: 60.0,
            all_fields: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LookupHit<'a> {
    pub entry: &'a DictionaryEntry,
    pub score: f64,
    /// The normalized text that produced the score.
    pub matched: String,
}

fn score(query: &str, candidate: &str) -> f64 {
    normalized_levenshtein(query, candidate) * 100.0
}

fn candidates(entry: &DictionaryEntry, all_fields: bool) -> Vec<String> {
    let mut texts = vec![normalize_key(&entry.headword)];
    if all_fields {
        texts.extend(entry.variants.iter().map(|variant| normalize_key(variant)));
        for sense in &entry.senses {
            let gloss = normalize_key(&sense.gloss);
            // single words of a gloss so "lion" finds "young lion"
            texts.extend(
                gloss
                    .split(|c: char| c.is_whitespace() || c == ',')
                    .map(normalize_key)
                    .filter(|word| !word.is_empty() && *word != gloss),
            );
            texts.push(gloss);
        }
    }
    texts.retain(|text| !text.is_empty());
    texts
}

fn best_match(query: &str, entry: &DictionaryEntry, all_fields: bool) -> Option<(f64, String)> {
    candidates(entry, all_fields)
        .into_iter()
        .map(|text| (score(query, &text), text))
        .max_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal))
}

/// Ranks corpus entries against `query`: best score first, ties broken by
/// entry identifier.
pub fn lookup<'a>(corpus: &'a Corpus, query: &str, options: &LookupOptions) -> Vec<LookupHit<'a>> {
    let query = normalize_key(query);
    if query.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<LookupHit<'a>> = corpus
        .entries
        .values()
        .filter_map(|entry| {
            let (score, matched) = best_match(&query, entry, options.all_fields)?;
            (score >= options.min_score).then_some(LookupHit {
                entry,
                score,
                matched,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.entry.id.cmp(&b.entry.id))
    });
    hits.truncate(options.top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{CorpusMetadata, EntryProvenance, PartOfSpeech, Sense};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn entry(id: &str, headword: &str, gloss: &str) -> DictionaryEntry {
        DictionaryEntry {
            id: id.to_string(),
            headword: headword.to_string(),
            variants: Default::default(),
            part_of_speech: PartOfSpeech::Unknown,
            senses: vec![Sense {
                gloss: gloss.to_string(),
                example: None,
                language: None,
            }],
            cross_references: Vec::new(),
            regions: Vec::new(),
            gender: None,
            origin: None,
            provenance: EntryProvenance {
                document: "dict1".to_string(),
                page_start: 1,
                page_end: 1,
            },
            issues: Vec::new(),
        }
    }

    fn corpus() -> Corpus {
        let entries: BTreeMap<String, DictionaryEntry> = [
            entry("gwida", "gwida", "many"),
            entry("gwida-2", "gwida", "much"),
            entry("hadal", "hadal", "young lion"),
            entry("aagil", "aagil", "elder"),
        ]
        .into_iter()
        .map(|entry| (entry.id.clone(), entry))
        .collect();
        Corpus {
            metadata: CorpusMetadata {
                sources: Vec::new(),
                generated_at: "t".to_string(),
            },
            entries,
        }
    }

    #[test]
    fn exact_headwords_rank_first_and_ties_sort_by_id() {
        let corpus = corpus();
        let hits = lookup(&corpus, "Gwida", &LookupOptions::default());
        let ids: Vec<&str> = hits.iter().map(|hit| hit.entry.id.as_str()).collect();
        assert_eq!(ids, vec!["gwida", "gwida-2"]);
        assert_eq!(hits[0].score, 100.0);
    }

    #[test]
    fn near_misses_pass_the_threshold() {
        let corpus = corpus();
        let hits = lookup(&corpus, "hadaal", &LookupOptions::default());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entry.id, "hadal");
        assert!(hits[0].score > 80.0);
    }

    #[test]
    fn glosses_are_searched_only_with_all_fields() {
        let corpus = corpus();
        assert!(lookup(&corpus, "lion", &LookupOptions::default()).is_empty());

        let options = LookupOptions {
            all_fields: true,
            ..LookupOptions::default()
        };
        let hits = lookup(&corpus, "lion", &options);
        assert_eq!(hits[0].entry.id, "hadal");
        assert_eq!(hits[0].matched, "lion");
    }

    #[test]
    fn top_k_limits_results_and_empty_query_finds_nothing() {
        let corpus = corpus();
        let options = LookupOptions {
            top_k: 1,
            min_score: 0.0,
            all_fields: false,
        };
        assert_eq!(lookup(&corpus, "gwida", &options).len(), 1);
        assert!(lookup(&corpus, "  ?! ", &options).is_empty());
    }
}
