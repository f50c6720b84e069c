//! Field extraction: one entry span in, one dictionary entry (or an
//! attributed diagnostic) out.

pub mod confusables;

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::MarkerConfig;
use crate::core::diagnostics::{DiagnosticContext, RunContext, Stage};
use crate::core::model::{
    CrossReference, DictionaryEntry, EntryProvenance, EntrySpan, GlossLanguage, PartOfSpeech,
    Sense, Token, TokenRole,
};
use crate::core::script::{has_arabic, has_latin};
use crate::layout::markers::MarkerTable;

use confusables::{OcrCorrector, ScriptHint, TableCorrector};

static NUMBERED_SENSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)[1-9][0-9]?[.)](?:\s|$)").expect("valid numbered sense pattern")
});

const FIELD_PUNCTUATION: &[char] = &[',', ';', ':', '؛', '،', '.', '(', ')', '[', ']'];

/// Gloss text accumulated for one sense group, with the examples that
/// followed it.
#[derive(Debug, Default)]
struct SenseGroup {
    gloss: String,
    examples: Vec<String>,
}

fn append_text(target: &mut String, text: &str) {
    if target.is_empty() {
        target.push_str(text);
    } else if let Some(stem) = target.strip_suffix('-') {
        *target = format!("{stem}{text}");
    } else {
        target.push(' ');
        target.push_str(text);
    }
}

fn clean_field(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(FIELD_PUNCTUATION)
        .trim()
        .to_string()
}

/// Splits a gloss on sense separators: `;`, Arabic `؛` and numbered
/// markers such as `1.` or `2)`.
pub fn split_senses(gloss: &str) -> Vec<String> {
    gloss
        .split([';', '؛'])
        .flat_map(|piece| NUMBERED_SENSE_RE.split(piece).map(clean_field).collect::<Vec<_>>())
        .filter(|piece| !piece.is_empty())
        .collect()
}

fn gloss_language(gloss: &str) -> Option<GlossLanguage> {
    if has_arabic(gloss) {
        Some(GlossLanguage::Ar)
    } else if has_latin(gloss) {
        Some(GlossLanguage::En)
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct FieldExtractor<C: OcrCorrector = TableCorrector> {
    markers: MarkerTable,
    corrector: C,
}

impl FieldExtractor<TableCorrector> {
    pub fn new(markers: &MarkerConfig) -> Self {
        Self::with_corrector(markers, TableCorrector::default())
    }
}

impl<C: OcrCorrector> FieldExtractor<C> {
    pub fn with_corrector(markers: &MarkerConfig, corrector: C) -> Self {
        Self {
            markers: MarkerTable::new(markers),
            corrector,
        }
    }

    fn correct_gloss(&self, text: &str) -> String {
        let hint = if has_arabic(text) {
            ScriptHint::Arabic
        } else {
            ScriptHint::Latin
        };
        self.corrector.correct(text, hint).text
    }

    fn symbol(&self, token: &Token) -> String {
        self.markers
            .canonical(&token.text)
            .unwrap_or_else(|| token.text.clone())
    }

    /// Surface strings of a cross-reference field; "see hadaab, gwida"
    /// names two targets.
    fn cross_reference_surfaces(&self, text: &str) -> Vec<String> {
        let text = clean_field(text);
        let Some(marker_len) = self.markers.cross_reference_prefix(&text) else {
            return vec![text];
        };
        let marker = text[..marker_len].trim();
        let targets: Vec<&str> = text[marker_len..]
            .split([',', ';', '،'])
            .map(str::trim)
            .filter(|target| !target.is_empty())
            .collect();
        if targets.len() <= 1 {
            return vec![text];
        }
        targets
            .into_iter()
            .map(|target| format!("{marker} {target}"))
            .collect()
    }

    /// Builds an entry from one span. Returns `None` after recording an
    /// error diagnostic when the span lacks a headword or any sense.
    pub fn extract(&self, span: &EntrySpan, run: &mut RunContext) -> Option<DictionaryEntry> {
        let Some((page, line)) = span.origin() else {
            run.error(
                Stage::Extract,
                DiagnosticContext::default(),
                "empty entry span has no tokens to extract",
            );
            return None;
        };
        let context = DiagnosticContext::at(page, line);

        let Some(head_token) = span.headword_token() else {
            let preview = span
                .tokens
                .iter()
                .map(|token| token.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            run.error(
                Stage::Extract,
                context,
                format!(
                    "span of {} token(s) has no headword: '{}'",
                    span.tokens.len(),
                    preview.chars().take(80).collect::<String>()
                ),
            );
            return None;
        };

        let corrected = self
            .corrector
            .correct(&clean_field(&head_token.text).to_lowercase(), ScriptHint::Beja);
        let headword = corrected.text.trim().to_string();
        if headword.is_empty() {
            run.error(
                Stage::Extract,
                context,
                format!("headword '{}' is empty after cleanup", head_token.text),
            );
            return None;
        }

        // (issue tag, diagnostic message) pairs, recorded once the id exists
        let mut issues: Vec<(&'static str, String)> = Vec::new();
        if !corrected.is_clean() {
            issues.push((
                "unexpected-characters",
                format!(
                    "headword '{headword}' has characters outside the Beja alphabet: {:?}",
                    corrected.unknown
                ),
            ));
        }

        let mut variants = BTreeSet::new();
        let mut part_of_speech: Option<PartOfSpeech> = None;
        let mut gender = None;
        let mut origin = None;
        let mut regions = Vec::new();
        let mut groups: Vec<SenseGroup> = Vec::new();
        let mut pending_examples: Vec<String> = Vec::new();
        let mut cross_references: Vec<String> = Vec::new();
        let mut previous_role: Option<TokenRole> = None;

        for token in &span.tokens {
            if std::ptr::eq(token, head_token) {
                previous_role = Some(TokenRole::Headword);
                continue;
            }
            let continues = token.joins_previous;
            match token.role {
                TokenRole::Headword | TokenRole::Variant => {
                    let variant = self
                        .corrector
                        .correct(&clean_field(&token.text).to_lowercase(), ScriptHint::Beja)
                        .text;
                    if !variant.is_empty() && variant != headword {
                        variants.insert(variant);
                    }
                }
                TokenRole::PartOfSpeech => {
                    let symbol = self.symbol(token);
                    let mapped = self.markers.part_of_speech(&symbol).unwrap_or_default();
                    match part_of_speech {
                        None => part_of_speech = Some(mapped),
                        Some(existing) if existing != mapped => issues.push((
                            "conflicting-part-of-speech",
                            format!("'{symbol}' conflicts with {}", existing.as_str()),
                        )),
                        Some(_) => {}
                    }
                    if gender.is_none() {
                        gender = self.markers.gender(&symbol);
                    }
                }
                TokenRole::Label => {
                    let symbol = self.symbol(token);
                    if let Some(region) = self.markers.region(&symbol) {
                        if !regions.contains(&region) {
                            regions.push(region);
                        }
                    } else if let Some(found) = self.markers.gender(&symbol) {
                        gender.get_or_insert(found);
                    } else if let Some(found) = self.markers.origin(&symbol) {
                        origin.get_or_insert(found);
                    } else {
                        issues.push(("unknown-label", format!("unrecognized label '{symbol}'")));
                    }
                }
                TokenRole::Gloss => {
                    let text = self.correct_gloss(token.text.trim());
                    match previous_role {
                        Some(TokenRole::CrossReference) if continues => {
                            if let Some(last) = cross_references.last_mut() {
                                append_text(last, &text);
                            }
                        }
                        Some(TokenRole::Gloss | TokenRole::Example) if continues && !groups.is_empty() => {
                            if let Some(group) = groups.last_mut() {
                                append_text(&mut group.gloss, &text);
                            }
                        }
                        _ => groups.push(SenseGroup {
                            gloss: text,
                            examples: Vec::new(),
                        }),
                    }
                }
                TokenRole::Example => {
                    let text = self.correct_gloss(&clean_field(&token.text));
                    let examples = match groups.last_mut() {
                        Some(group) => &mut group.examples,
                        None => &mut pending_examples,
                    };
                    match examples.last_mut() {
                        Some(last) if continues && previous_role == Some(TokenRole::Example) => {
                            append_text(last, &text)
                        }
                        _ => examples.push(text),
                    }
                }
                TokenRole::CrossReference => {
                    cross_references.extend(self.cross_reference_surfaces(&token.text));
                }
            }
            previous_role = Some(token.role);
        }

        let mut senses: Vec<Sense> = Vec::new();
        for group in groups {
            let pieces = split_senses(&group.gloss);
            let count = pieces.len();
            for (idx, gloss) in pieces.into_iter().enumerate() {
                let example = (idx + 1 == count && !group.examples.is_empty())
                    .then(|| group.examples.join("; "));
                senses.push(Sense {
                    language: gloss_language(&gloss),
                    gloss,
                    example,
                });
            }
        }
        if let Some(first) = senses.first_mut() {
            if !pending_examples.is_empty() {
                let mut examples = pending_examples;
                examples.extend(first.example.take());
                first.example = Some(examples.join("; "));
            }
        }

        if senses.is_empty() {
            run.error(
                Stage::Extract,
                context,
                format!("entry '{headword}' has no gloss and is excluded"),
            );
            return None;
        }

        let id = run.allocate_id(&headword);
        let (page_start, page_end) = span.page_range().unwrap_or((page, page));
        let mut entry = DictionaryEntry {
            id: id.clone(),
            headword,
            variants,
            part_of_speech: part_of_speech.unwrap_or_default(),
            senses,
            cross_references: cross_references
                .into_iter()
                .map(CrossReference::unresolved)
                .collect(),
            regions,
            gender,
            origin,
            provenance: EntryProvenance {
                document: span.source.clone(),
                page_start,
                page_end,
            },
            issues: Vec::new(),
        };
        for (issue, message) in issues {
            entry.mark(issue);
            run.warn(Stage::Extract, context.clone().with_entry(&id), message);
        }
        Some(entry)
    }
}

/// Extracts every span of one source in order; spans that fail extraction
/// leave a diagnostic behind and no entry.
pub fn extract_entries<C: OcrCorrector>(
    extractor: &FieldExtractor<C>,
    spans: &[EntrySpan],
    run: &mut RunContext,
) -> Vec<DictionaryEntry> {
    let entries: Vec<DictionaryEntry> = spans
        .iter()
        .filter_map(|span| extractor.extract(span, run))
        .collect();
    tracing::debug!(
        source = run.source(),
        spans = spans.len(),
        entries = entries.len(),
        "extracted entries"
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::Severity;
    use crate::core::model::{Gender, LayoutKind, Origin, Region};
    use pretty_assertions::assert_eq;

    fn span(tokens: Vec<Token>) -> EntrySpan {
        EntrySpan {
            source: "dict1".to_string(),
            layout: LayoutKind::Starred,
            tokens,
        }
    }

    fn tok(text: &str, role: TokenRole) -> Token {
        Token::new(text, role, 3, 1, 0)
    }

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(&MarkerConfig::starred())
    }

    #[test]
    fn extracts_all_fields_of_a_starred_entry() {
        let span = span(vec![
            tok("aagil", TokenRole::Headword),
            tok("aagal", TokenRole::Variant),
            tok("elder, old man", TokenRole::Gloss),
            tok("aagil tak", TokenRole::Example),
            tok("شيخ", TokenRole::Gloss),
            tok("N", TokenRole::PartOfSpeech),
            tok("m", TokenRole::Label),
            tok("Cush", TokenRole::Label),
            tok("Er", TokenRole::Label),
            tok("Su", TokenRole::Label),
        ]);
        let mut run = RunContext::new("dict1");
        let entry = extractor().extract(&span, &mut run).unwrap();

        assert_eq!(entry.id, "aagil");
        assert_eq!(entry.variants.iter().collect::<Vec<_>>(), vec!["aagal"]);
        assert_eq!(entry.part_of_speech, PartOfSpeech::Noun);
        assert_eq!(
            entry.senses,
            vec![
                Sense {
                    gloss: "elder, old man".to_string(),
                    example: Some("aagil tak".to_string()),
                    language: Some(GlossLanguage::En),
                },
                Sense {
                    gloss: "شيخ".to_string(),
                    example: None,
                    language: Some(GlossLanguage::Ar),
                },
            ]
        );
        assert_eq!(entry.gender, Some(Gender::Masculine));
        assert_eq!(entry.origin, Some(Origin::Cushitic));
        assert_eq!(entry.regions, vec![Region::Eritrea, Region::Sudan]);
        assert_eq!(entry.provenance.page_start, 3);
        assert!(entry.issues.is_empty());
        assert!(run.diagnostics().is_empty());
    }

    #[test]
    fn span_without_headword_is_an_error() {
        let span = span(vec![tok("stray gloss", TokenRole::Gloss)]);
        let mut run = RunContext::new("dict1");
        assert!(extractor().extract(&span, &mut run).is_none());
        assert_eq!(run.count(Severity::Error), 1);
        assert_eq!(run.diagnostics()[0].stage, Stage::Extract);
    }

    #[test]
    fn empty_span_is_reported() {
        let mut run = RunContext::new("dict1");
        assert!(extractor().extract(&span(Vec::new()), &mut run).is_none());
        assert_eq!(run.count(Severity::Error), 1);
        assert_eq!(run.diagnostics()[0].context, DiagnosticContext::default());
    }

    #[test]
    fn entry_without_senses_is_excluded() {
        let span = span(vec![tok("gwida", TokenRole::Headword), tok("N", TokenRole::PartOfSpeech)]);
        let mut run = RunContext::new("dict1");
        assert!(extractor().extract(&span, &mut run).is_none());
        assert_eq!(run.count(Severity::Error), 1);
    }

    #[test]
    fn wrapped_glosses_join_and_separators_split() {
        let span = span(vec![
            tok("rak", TokenRole::Headword),
            tok("1. to go 2. to walk; to lea-", TokenRole::Gloss),
            tok("ve", TokenRole::Gloss).joined(),
            tok("V", TokenRole::PartOfSpeech),
        ]);
        let mut run = RunContext::new("dict1");
        let entry = extractor().extract(&span, &mut run).unwrap();
        let glosses: Vec<_> = entry.senses.iter().map(|s| s.gloss.as_str()).collect();
        assert_eq!(glosses, vec!["to go", "to walk", "to leave"]);
        assert_eq!(entry.part_of_speech, PartOfSpeech::Verb);
    }

    #[test]
    fn unknown_pos_and_label_are_recorded() {
        let span = span(vec![
            tok("gwida", TokenRole::Headword),
            tok("many", TokenRole::Gloss),
            tok("Zz", TokenRole::Label),
        ]);
        let mut run = RunContext::new("dict1");
        let entry = extractor().extract(&span, &mut run).unwrap();
        assert_eq!(entry.part_of_speech, PartOfSpeech::Unknown);
        assert_eq!(entry.issues, vec!["unknown-label".to_string()]);
        assert_eq!(run.count(Severity::Warning), 1);
        assert_eq!(run.diagnostics()[0].context.entry.as_deref(), Some("gwida"));
    }

    #[test]
    fn cross_reference_lists_become_separate_surfaces() {
        let span = span(vec![
            tok("hadal", TokenRole::Headword),
            tok("lion", TokenRole::Gloss),
            tok("see hadaab, gwida", TokenRole::CrossReference),
        ]);
        let mut run = RunContext::new("dict1");
        let entry = extractor().extract(&span, &mut run).unwrap();
        assert_eq!(
            entry.cross_references,
            vec![
                CrossReference::unresolved("see hadaab"),
                CrossReference::unresolved("see gwida"),
            ]
        );
    }

    #[test]
    fn homographs_get_distinct_ids_and_headwords_are_corrected() {
        let first = span(vec![tok("gwida", TokenRole::Headword), tok("many", TokenRole::Gloss)]);
        let second = span(vec![tok("gwidа", TokenRole::Headword), tok("much", TokenRole::Gloss)]);
        let mut run = RunContext::new("dict1");
        let entries = extract_entries(&extractor(), &[first, second], &mut run);
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["gwida", "gwida-2"]);
        assert_eq!(entries[1].headword, "gwida");
    }

    #[test]
    fn splits_numbered_senses() {
        assert_eq!(split_senses("1. big 2) large"), vec!["big", "large"]);
        assert_eq!(split_senses("3.5 cubits"), vec!["3.5 cubits"]);
        assert_eq!(split_senses("كبير؛ عظيم"), vec!["كبير", "عظيم"]);
    }
}
