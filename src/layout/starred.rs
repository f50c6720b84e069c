//! Tokenizer for the Beja → English/Arabic dictionary, where each entry is
//! a run of `*`-separated fields:
//!
//! `aagil, aagal * elder, old man * شيخ * N m Cush * Er Su`
//!
//! Pages may be set in several columns; each column is read top to bottom
//! before the next one.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::StarredLayout;
use crate::core::diagnostics::RunContext;
use crate::core::model::{LayoutKind, Token, TokenRole};
use crate::core::script::{has_letters, is_beja_word};
use crate::extract::confusables::{OcrCorrector, ScriptHint, TableCorrector};
use crate::layout::markers::MarkerTable;
use crate::layout::{gloss_tokens, PageTokenizer};
use crate::normalize::{collapse_spaces, indent_of, CleanPage};
use crate::segment::EntryBoundary;

static LEADING_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9٠-٩]+\s+(\S.*)$").expect("valid leading digits pattern"));

// "*m_aagil * ..." or "*f aagil * ..." : a gender tag glued onto the headword
static STAR_NOISE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\*(?:m|f|n|mf)[ _]+([a-z][a-z']*(?:/[a-z])?)\b(.*)$")
        .expect("valid star noise pattern")
});

const MAX_HEADWORD_WORDS: usize = 3;

/// One column's share of a physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnLine {
    line: usize,
    indent: usize,
    text: String,
}

#[derive(Debug, Clone)]
pub struct StarredTokenizer {
    layout: StarredLayout,
    markers: MarkerTable,
    corrector: TableCorrector,
    never_headwords: BTreeSet<String>,
}

impl StarredTokenizer {
    pub fn new(layout: &StarredLayout) -> Self {
        let markers = MarkerTable::new(&layout.markers);
        let mut never_headwords = layout.never_headwords.clone();
        never_headwords.extend(markers.symbols().map(str::to_string));
        Self {
            layout: layout.clone(),
            markers,
            corrector: TableCorrector::default(),
            never_headwords,
        }
    }

    /// Cuts every line at the configured character offsets. Lines still carry
    /// their printed spacing here, so the offsets line up with the page.
    fn split_columns(&self, page: &CleanPage) -> Vec<ColumnLine> {
        let column_count = self.layout.column_boundaries.len() + 1;
        let mut columns: Vec<Vec<ColumnLine>> = vec![Vec::new(); column_count];

        for (line, text) in page.lines() {
            let chars: Vec<char> = text.chars().collect();
            let mut start = 0usize;
            for (idx, column) in columns.iter_mut().enumerate() {
                let end = self
                    .layout
                    .column_boundaries
                    .get(idx)
                    .copied()
                    .unwrap_or(chars.len())
                    .min(chars.len());
                if start >= end {
                    start = start.max(end);
                    continue;
                }
                let segment: String = chars[start..end].iter().collect();
                start = end;
                if segment.trim().is_empty() {
                    continue;
                }
                column.push(ColumnLine {
                    line,
                    indent: indent_of(&segment),
                    text: collapse_spaces(segment.trim()),
                });
            }
        }

        columns.into_iter().flatten().collect()
    }

    fn repair_line(&self, text: &str) -> String {
        let mut line = text.to_string();
        if let Some(caps) = LEADING_DIGITS_RE.captures(&line) {
            line = caps[1].to_string();
        }
        if let Some(caps) = STAR_NOISE_RE.captures(&line) {
            line = format!("{} {}", &caps[1], caps[2].trim_start()).trim().to_string();
        }
        line
    }

    fn is_headword_word(&self, word: &str) -> bool {
        let cleaned = word.replace('\\', "");
        let corrected = self.corrector.correct(&cleaned, ScriptHint::Beja).text;
        is_beja_word(&corrected) && !self.never_headwords.contains(&corrected)
    }

    /// Headword and variants from the zone before the first `*`, or `None`
    /// when the line does not open an entry.
    fn parse_head_zone(&self, line: &str) -> Option<(String, Vec<String>, String)> {
        let (head_zone, after) = line.split_once('*')?;
        let head_zone = head_zone.trim();
        if head_zone.is_empty() {
            return None;
        }

        let mut parts = head_zone.split([',', ';']).map(str::trim);
        let first = parts.next()?;
        let words: Vec<&str> = first.split_whitespace().collect();
        if words.first().map_or(true, |w| self.never_headwords.contains(*w)) {
            return None;
        }
        let head_words: Vec<String> = words
            .iter()
            .take_while(|w| self.is_headword_word(w))
            .take(MAX_HEADWORD_WORDS)
            .map(|w| w.replace('\\', ""))
            .collect();
        if head_words.is_empty() {
            return None;
        }

        let strong = line.matches('*').count() >= 2
            || line
                .split(|c: char| c.is_whitespace() || c == '*')
                .any(|w| !w.is_empty() && self.markers.exact(w).is_some());
        let weak = has_letters(after);
        if !(strong || weak) {
            return None;
        }

        let leftover = words[head_words.len()..].join(" ");
        let variants = parts
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect();
        Some((head_words.join(" "), variants, leftover))
    }

    /// Tokens for one `*`-delimited field that is not a head zone.
    fn field_tokens(&self, field: &str, at: (usize, usize, usize), joins: bool) -> Vec<Token> {
        let (page, line, column) = at;
        let field = field.trim();
        if field.is_empty() {
            return Vec::new();
        }

        if self.markers.cross_reference_prefix(field).is_some() {
            let token = Token::new(field, TokenRole::CrossReference, page, line, column);
            return vec![if joins { token.joined() } else { token }];
        }

        let words: Vec<&str> = field.split_whitespace().collect();
        if let Some(tags) = self.tag_tokens(&words, page, line, column) {
            return tags;
        }

        let peel = self.trailing_tag_count(&words);
        let (gloss_words, tag_words) = words.split_at(words.len() - peel);
        let mut tokens = gloss_tokens(&gloss_words.join(" "), page, line, column, joins);
        if !tag_words.is_empty() {
            tokens.extend(
                self.tag_tokens(tag_words, page, line, column)
                    .unwrap_or_default(),
            );
        }
        tokens
    }

    /// Marker tokens when every word of a field is a marker.
    fn tag_tokens(&self, words: &[&str], page: usize, line: usize, column: usize) -> Option<Vec<Token>> {
        if words.is_empty() {
            return None;
        }
        let has_region = words
            .iter()
            .any(|w| self.markers.exact(w).and_then(|s| self.markers.region(&s)).is_some());
        let mut tokens = Vec::with_capacity(words.len());
        for word in words {
            if matches!(*word, "-" | "—" | "_") {
                continue;
            }
            // OCR drops the "u" of "Su" inside region lists
            let symbol = if *word == "S" && has_region {
                "Su".to_string()
            } else {
                self.markers.canonical(word)?
            };
            let role = if self.markers.part_of_speech(&symbol).is_some() {
                TokenRole::PartOfSpeech
            } else {
                TokenRole::Label
            };
            tokens.push(Token::new(symbol, role, page, line, column));
        }
        Some(tokens)
    }

    /// Number of trailing words that are exact markers glued onto a gloss
    /// ("old man N m"). Requires a capitalized marker so lone "m"/"f" words
    /// stay in the gloss.
    fn trailing_tag_count(&self, words: &[&str]) -> usize {
        let count = words
            .iter()
            .rev()
            .take_while(|w| self.markers.exact(w).is_some())
            .count()
            .min(words.len().saturating_sub(1));
        let capitalized = words[words.len() - count..]
            .iter()
            .any(|w| w.starts_with(|c: char| c.is_ascii_uppercase()));
        if capitalized {
            count
        } else {
            0
        }
    }

    fn line_tokens(&self, page: usize, column_line: &ColumnLine) -> Vec<Token> {
        let line = self.repair_line(&column_line.text);
        let at = (page, column_line.line, column_line.indent);
        let mut tokens = Vec::new();

        if let Some((headword, variants, leftover)) = self.parse_head_zone(&line) {
            tokens.push(Token::new(
                headword,
                TokenRole::Headword,
                page,
                column_line.line,
                column_line.indent,
            ));
            for variant in variants {
                let role = if variant.split_whitespace().all(|w| self.is_headword_word(w)) {
                    TokenRole::Variant
                } else {
                    TokenRole::Gloss
                };
                tokens.push(Token::new(variant, role, page, column_line.line, column_line.indent));
            }
            if !leftover.is_empty() {
                tokens.extend(self.field_tokens(&leftover, at, false));
            }
            let fields = line.split('*').skip(1);
            for field in fields {
                tokens.extend(self.field_tokens(field, at, false));
            }
            return tokens;
        }

        // Continuation: text before the first star finishes the previous
        // line's field, every later field starts fresh.
        for (idx, field) in line.split('*').enumerate() {
            tokens.extend(self.field_tokens(field, at, idx == 0));
        }
        tokens
    }
}

impl EntryBoundary for StarredTokenizer {
    fn layout(&self) -> LayoutKind {
        LayoutKind::Starred
    }

    fn opens_entry(&self, token: &Token) -> bool {
        token.column <= self.layout.headword_max_indent
    }
}

impl PageTokenizer for StarredTokenizer {
    fn tokenize_page(&self, page: &CleanPage, _run: &mut RunContext) -> Vec<Token> {
        self.split_columns(page)
            .iter()
            .flat_map(|column_line| self.line_tokens(page.page_idx, column_line))
            .collect()
    }
}
