use strsim::normalized_levenshtein;

use crate::config::MarkerConfig;
use crate::core::model::{Gender, Origin, PartOfSpeech, Region};

/// Lookup over a layout's marker glyphs. Exact symbols win, then the known
/// OCR misreadings, then a unique fuzzy match.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    config: MarkerConfig,
    cross_reference: Vec<String>,
}

impl MarkerTable {
    pub fn new(config: &MarkerConfig) -> Self {
        let mut cross_reference: Vec<String> = config
            .cross_reference
            .iter()
            .map(|marker| marker.to_lowercase())
            .collect();
        // "var. of" must be tried before "var."-like prefixes of itself
        cross_reference.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self {
            config: config.clone(),
            cross_reference,
        }
    }

    pub fn is_known(&self, symbol: &str) -> bool {
        self.config.part_of_speech.contains_key(symbol)
            || self.config.regions.contains_key(symbol)
            || self.config.genders.contains_key(symbol)
            || self.config.origins.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.config
            .part_of_speech
            .keys()
            .chain(self.config.regions.keys())
            .chain(self.config.genders.keys())
            .chain(self.config.origins.keys())
            .map(String::as_str)
    }

    /// Canonical marker symbol for a raw word, if it is one.
    pub fn canonical(&self, raw: &str) -> Option<String> {
        let word = raw.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '[' | ']'));
        if word.is_empty() {
            return None;
        }
        if let Some(symbol) = self.exact(word) {
            return Some(symbol);
        }
        if let Some(fixed) = self.config.corrections.get(word) {
            return Some(fixed.clone());
        }
        self.fuzzy(word)
    }

    /// Canonical symbol without fuzzy matching; used where a false positive
    /// would swallow gloss text.
    pub fn exact(&self, word: &str) -> Option<String> {
        let candidates = [word, word.trim_end_matches('?'), word.trim_end_matches('.')];
        candidates
            .iter()
            .find(|candidate| !candidate.is_empty() && self.is_known(candidate))
            .map(|candidate| candidate.to_string())
            .or_else(|| self.config.corrections.get(word).cloned())
    }

    fn fuzzy(&self, word: &str) -> Option<String> {
        if word.chars().count() < 3 {
            return None;
        }
        let first = word.chars().next()?;
        let mut best: Option<(&str, f64)> = None;
        let mut tied = false;
        for symbol in self.symbols() {
            if symbol.chars().count() < 3 || !symbol.starts_with(first) {
                continue;
            }
            let score = normalized_levenshtein(word, symbol);
            if score < self.config.fuzzy_threshold {
                continue;
            }
            match best {
                Some((_, best_score)) if (score - best_score).abs() < f64::EPSILON => tied = true,
                Some((_, best_score)) if score < best_score => {}
                _ => {
                    best = Some((symbol, score));
                    tied = false;
                }
            }
        }
        if tied {
            return None;
        }
        best.map(|(symbol, _)| symbol.to_string())
    }

    pub fn part_of_speech(&self, symbol: &str) -> Option<PartOfSpeech> {
        self.config.part_of_speech.get(symbol).copied()
    }

    pub fn region(&self, symbol: &str) -> Option<Region> {
        self.config.regions.get(symbol).copied()
    }

    pub fn gender(&self, symbol: &str) -> Option<Gender> {
        self.config.genders.get(symbol).copied()
    }

    pub fn origin(&self, symbol: &str) -> Option<Origin> {
        self.config.origins.get(symbol).copied()
    }

    /// Length in bytes of a leading cross-reference marker ("see", "cf.",
    /// "var. of"), when the text starts with one followed by a target.
    pub fn cross_reference_prefix(&self, text: &str) -> Option<usize> {
        let lower = text.to_lowercase();
        if lower.len() != text.len() {
            return None;
        }
        self.cross_reference.iter().find_map(|marker| {
            let rest = lower.strip_prefix(marker.as_str())?;
            let boundary = rest.starts_with(char::is_whitespace)
                || !marker.ends_with(|c: char| c.is_alphanumeric());
            (boundary && !rest.trim().is_empty()).then_some(marker.len())
        })
    }
}
