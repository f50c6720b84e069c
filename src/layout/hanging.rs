//! Tokenizer for the single-column Beja → English dictionary. Headwords sit
//! at the left margin, wrapped lines are indented:
//!
//! ```text
//! aagil, aagal n. elder, old man (aagil tak); see hadal
//!     of the tribe
//! ```

use std::collections::BTreeSet;

use crate::config::HangingLayout;
use crate::core::diagnostics::RunContext;
use crate::core::model::{LayoutKind, Token, TokenRole};
use crate::core::script::{has_arabic, is_beja_headword_shape};
use crate::extract::confusables::{OcrCorrector, ScriptHint, TableCorrector};
use crate::layout::markers::MarkerTable;
use crate::layout::{gloss_tokens, PageTokenizer};
use crate::normalize::{collapse_spaces, indent_of, CleanPage};
use crate::segment::EntryBoundary;

const HEADWORD_TRIM: &[char] = &[
    '.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '<', '>', '"', '“', '”',
];

#[derive(Debug, Clone)]
pub struct HangingTokenizer {
    layout: HangingLayout,
    markers: MarkerTable,
    corrector: TableCorrector,
    bad_headwords: BTreeSet<String>,
    continuation_prefixes: Vec<String>,
}

impl HangingTokenizer {
    pub fn new(layout: &HangingLayout) -> Self {
        Self {
            layout: layout.clone(),
            markers: MarkerTable::new(&layout.markers),
            corrector: TableCorrector::default(),
            bad_headwords: layout
                .bad_headwords
                .iter()
                .map(|word| word.to_lowercase())
                .collect(),
            continuation_prefixes: layout
                .continuation_prefixes
                .iter()
                .map(|prefix| prefix.to_lowercase())
                .collect(),
        }
    }

    fn normalize_headword(word: &str) -> String {
        word.to_lowercase().trim_matches(HEADWORD_TRIM).to_string()
    }

    fn is_headword_shape(&self, word: &str) -> bool {
        let candidate = Self::normalize_headword(word);
        let corrected = self.corrector.correct(&candidate, ScriptHint::Beja).text;
        !self.bad_headwords.contains(&corrected)
            && !corrected.chars().any(|c| c.is_ascii_digit())
            && !has_arabic(&corrected)
            && is_beja_headword_shape(&corrected)
    }

    fn starts_with_continuation_prefix(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.continuation_prefixes.iter().any(|prefix| {
            lower.strip_prefix(prefix.as_str()).is_some_and(|rest| {
                !rest.starts_with(|c: char| c.is_alphanumeric())
                    || !prefix.ends_with(|c: char| c.is_alphanumeric())
            })
        })
    }

    /// Real entry lines carry a part-of-speech marker or at least some
    /// gloss punctuation; a lone word is a wrapped fragment.
    fn is_entry_like(&self, words: &[&str]) -> bool {
        if words.len() < 2 {
            return false;
        }
        words.iter().any(|w| {
            self.markers
                .exact(w)
                .is_some_and(|symbol| self.markers.part_of_speech(&symbol).is_some())
        }) || words
            .iter()
            .any(|w| w.contains([',', ';', ':', '.']))
    }

    fn opens_line(&self, indent: usize, body: &str, words: &[&str]) -> bool {
        indent <= self.layout.headword_max_indent
            && !self.starts_with_continuation_prefix(body)
            && self.is_entry_like(words)
            && words.first().is_some_and(|w| self.is_headword_shape(w))
    }

    fn head_line_tokens(&self, words: &[&str], at: (usize, usize, usize)) -> Vec<Token> {
        let (page, line, column) = at;
        let mut tokens = vec![Token::new(
            Self::normalize_headword(words[0]),
            TokenRole::Headword,
            page,
            line,
            column,
        )];

        let mut idx = 1;
        // comma list straight after the headword: "aagil, aagal, aagul n."
        let mut listing = words[0].ends_with(',');
        while listing && idx < words.len() {
            let word = words[idx];
            let bare = word.trim_end_matches(',');
            if self.markers.exact(bare).is_some() || !self.is_headword_shape(bare) {
                break;
            }
            tokens.push(Token::new(
                Self::normalize_headword(bare),
                TokenRole::Variant,
                page,
                line,
                column,
            ));
            listing = word.ends_with(',');
            idx += 1;
        }

        while idx + 1 < words.len()
            && words[idx].eq_ignore_ascii_case("also")
            && self.is_headword_shape(words[idx + 1])
        {
            tokens.push(Token::new(
                Self::normalize_headword(words[idx + 1]),
                TokenRole::Variant,
                page,
                line,
                column,
            ));
            idx += 2;
        }

        while idx < words.len() {
            let Some(symbol) = self.markers.exact(words[idx]) else {
                break;
            };
            let role = if self.markers.part_of_speech(&symbol).is_some() {
                TokenRole::PartOfSpeech
            } else {
                TokenRole::Label
            };
            tokens.push(Token::new(symbol, role, page, line, column));
            idx += 1;
        }

        let rest = words[idx..].join(" ");
        tokens.extend(self.body_tokens(&rest, at, false));
        tokens
    }

    fn continuation_tokens(&self, words: &[&str], at: (usize, usize, usize)) -> Vec<Token> {
        let (page, line, column) = at;
        if words.len() >= 2 && words[0].eq_ignore_ascii_case("also") && self.is_headword_shape(words[1]) {
            let mut tokens = vec![Token::new(
                Self::normalize_headword(words[1]),
                TokenRole::Variant,
                page,
                line,
                column,
            )];
            tokens.extend(self.body_tokens(&words[2..].join(" "), at, false));
            return tokens;
        }
        self.body_tokens(&words.join(" "), at, true)
    }

    /// Gloss text after the head zone: `;` separates senses, a
    /// cross-reference marker at a phrase boundary opens a reference.
    fn body_tokens(&self, text: &str, at: (usize, usize, usize), joins: bool) -> Vec<Token> {
        let (page, line, column) = at;
        let mut tokens = Vec::new();
        for (idx, segment) in text.split([';', '؛']).enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let joins = joins && idx == 0;
            let (gloss, reference) = self.split_cross_reference(segment);
            if !gloss.is_empty() {
                tokens.extend(gloss_tokens(gloss, page, line, column, joins));
            }
            if let Some(reference) = reference {
                tokens.push(Token::new(
                    reference,
                    TokenRole::CrossReference,
                    page,
                    line,
                    column,
                ));
            }
        }
        tokens
    }

    fn split_cross_reference<'a>(&self, segment: &'a str) -> (&'a str, Option<&'a str>) {
        if self.markers.cross_reference_prefix(segment).is_some() {
            return ("", Some(segment));
        }
        for (idx, c) in segment.char_indices() {
            if !matches!(c, ',' | '.') {
                continue;
            }
            let rest = &segment[idx + c.len_utf8()..];
            if !rest.starts_with(' ') {
                continue;
            }
            let rest = rest.trim_start();
            if self.markers.cross_reference_prefix(rest).is_some() {
                return (segment[..idx].trim(), Some(rest));
            }
        }
        (segment, None)
    }
}

impl EntryBoundary for HangingTokenizer {
    fn layout(&self) -> LayoutKind {
        LayoutKind::Hanging
    }

    fn opens_entry(&self, token: &Token) -> bool {
        token.column <= self.layout.headword_max_indent
    }
}

impl PageTokenizer for HangingTokenizer {
    fn tokenize_page(&self, page: &CleanPage, _run: &mut RunContext) -> Vec<Token> {
        let mut tokens = Vec::new();
        for (line, text) in page.lines() {
            let text = collapse_spaces(text);
            let indent = indent_of(&text);
            let body = text.trim();
            let words: Vec<&str> = body.split_whitespace().collect();
            let at = (page.page_idx, line, indent);
            if self.opens_line(indent, body, &words) {
                tokens.extend(self.head_line_tokens(&words, at));
            } else {
                tokens.extend(self.continuation_tokens(&words, at));
            }
        }
        tokens
    }
}
