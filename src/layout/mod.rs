//! Layout tokenizers. Each printed dictionary gets its own tokenizer; all of
//! them emit the same flat `Token` stream so segmentation never needs to
//! know which layout produced it.

pub mod hanging;
pub mod markers;
pub mod starred;
pub mod stitch;

use crate::config::LayoutConfig;
use crate::core::diagnostics::{DiagnosticContext, RunContext, Stage};
use crate::core::model::{LayoutKind, Token, TokenRole};
use crate::normalize::CleanPage;
use crate::segment::EntryBoundary;

pub use hanging::HangingTokenizer;
pub use markers::MarkerTable;
pub use starred::StarredTokenizer;
pub use stitch::stitch_pages;

pub trait PageTokenizer: EntryBoundary {
    fn tokenize_page(&self, page: &CleanPage, run: &mut RunContext) -> Vec<Token>;
}

/// The tokenizer selected by a source's layout configuration.
#[derive(Debug, Clone)]
pub enum SourceTokenizer {
    Starred(StarredTokenizer),
    Hanging(HangingTokenizer),
}

impl SourceTokenizer {
    pub fn from_config(layout: &LayoutConfig) -> Self {
        match layout {
            LayoutConfig::Starred(layout) => SourceTokenizer::Starred(StarredTokenizer::new(layout)),
            LayoutConfig::Hanging(layout) => SourceTokenizer::Hanging(HangingTokenizer::new(layout)),
        }
    }
}

impl EntryBoundary for SourceTokenizer {
    fn layout(&self) -> LayoutKind {
        match self {
            SourceTokenizer::Starred(tokenizer) => tokenizer.layout(),
            SourceTokenizer::Hanging(tokenizer) => tokenizer.layout(),
        }
    }

    fn opens_entry(&self, token: &Token) -> bool {
        match self {
            SourceTokenizer::Starred(tokenizer) => tokenizer.opens_entry(token),
            SourceTokenizer::Hanging(tokenizer) => tokenizer.opens_entry(token),
        }
    }
}

impl PageTokenizer for SourceTokenizer {
    fn tokenize_page(&self, page: &CleanPage, run: &mut RunContext) -> Vec<Token> {
        match self {
            SourceTokenizer::Starred(tokenizer) => tokenizer.tokenize_page(page, run),
            SourceTokenizer::Hanging(tokenizer) => tokenizer.tokenize_page(page, run),
        }
    }
}

/// Tokenizes every page of one source in page order and stitches fields
/// that were cut by a page break.
pub fn tokenize_source<T: PageTokenizer + ?Sized>(
    tokenizer: &T,
    pages: &[CleanPage],
    run: &mut RunContext,
) -> Vec<Token> {
    let mut per_page = Vec::with_capacity(pages.len());
    for page in pages {
        if page.is_empty() {
            per_page.push(Vec::new());
            continue;
        }
        let tokens = tokenizer.tokenize_page(page, run);
        if tokens.is_empty() {
            run.warn(
                Stage::Tokenize,
                DiagnosticContext::page(page.page_idx),
                "page has text but produced no tokens",
            );
        }
        tracing::debug!(page = page.page_idx, tokens = tokens.len(), "tokenized page");
        per_page.push(tokens);
    }
    stitch_pages(per_page, run)
}

/// Splits a gloss field into gloss and example tokens: parenthesised text
/// is an example. A `)` with no opening bracket closes an example begun on
/// the previous line.
pub(crate) fn gloss_tokens(
    text: &str,
    page: usize,
    line: usize,
    column: usize,
    joins: bool,
) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut current = String::new();
    let mut in_example = false;

    let flush = |tokens: &mut Vec<Token>, current: &mut String, role: TokenRole| {
        let piece = current.trim().trim_end_matches(',').trim();
        if !piece.is_empty() {
            let token = Token::new(piece, role, page, line, column);
            // the first piece continues a wrapped field; later gloss pieces
            // continue the gloss an example interrupted
            let token = if (tokens.is_empty() && joins) || (!tokens.is_empty() && role == TokenRole::Gloss) {
                token.joined()
            } else {
                token
            };
            tokens.push(token);
        }
        current.clear();
    };

    for c in text.chars() {
        match c {
            '(' if !in_example => {
                flush(&mut tokens, &mut current, TokenRole::Gloss);
                in_example = true;
            }
            ')' if in_example => {
                flush(&mut tokens, &mut current, TokenRole::Example);
                in_example = false;
            }
            ')' if tokens.is_empty() && joins => {
                flush(&mut tokens, &mut current, TokenRole::Example);
            }
            _ => current.push(c),
        }
    }
    if in_example {
        let before = tokens.len();
        flush(&mut tokens, &mut current, TokenRole::Example);
        if tokens.len() > before {
            if let Some(last) = tokens.last_mut() {
                last.unclosed = true;
            }
        }
    } else {
        flush(&mut tokens, &mut current, TokenRole::Gloss);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HangingLayout, StarredLayout};
    use pretty_assertions::assert_eq;

    fn roles(tokens: &[Token]) -> Vec<(TokenRole, &str, bool)> {
        tokens
            .iter()
            .map(|t| (t.role, t.text.as_str(), t.joins_previous))
            .collect()
    }

    #[test]
    fn parenthetical_becomes_example() {
        let tokens = gloss_tokens("elder, old man (aagil tak)", 1, 1, 0, false);
        assert_eq!(
            roles(&tokens),
            vec![
                (TokenRole::Gloss, "elder, old man", false),
                (TokenRole::Example, "aagil tak", false),
            ]
        );
    }

    #[test]
    fn gloss_after_example_continues_the_gloss() {
        let tokens = gloss_tokens("camel (young) calf", 1, 1, 0, false);
        assert_eq!(
            roles(&tokens),
            vec![
                (TokenRole::Gloss, "camel", false),
                (TokenRole::Example, "young", false),
                (TokenRole::Gloss, "calf", true),
            ]
        );
    }

    #[test]
    fn unbalanced_brackets_span_lines() {
        let open = gloss_tokens("to go (oo rak", 1, 1, 0, false);
        assert_eq!(open[1].role, TokenRole::Example);
        assert!(open[1].unclosed);

        let close = gloss_tokens("tak) and more", 1, 2, 2, true);
        assert_eq!(
            roles(&close),
            vec![
                (TokenRole::Example, "tak", true),
                (TokenRole::Gloss, "and more", true),
            ]
        );
    }

    #[test]
    fn tokenizer_follows_configured_layout() {
        let starred = SourceTokenizer::from_config(&LayoutConfig::Starred(StarredLayout::default()));
        assert_eq!(starred.layout(), LayoutKind::Starred);
        let hanging = SourceTokenizer::from_config(&LayoutConfig::Hanging(HangingLayout::default()));
        assert_eq!(hanging.layout(), LayoutKind::Hanging);
    }

    #[test]
    fn empty_pages_are_skipped_silently() {
        let tokenizer = SourceTokenizer::from_config(&LayoutConfig::Starred(StarredLayout::default()));
        let pages = vec![
            CleanPage {
                source: "dict1".to_string(),
                page_idx: 1,
                text: String::new(),
            },
            CleanPage {
                source: "dict1".to_string(),
                page_idx: 2,
                text: "gwida * many".to_string(),
            },
        ];
        let mut run = RunContext::new("dict1");
        let tokens = tokenize_source(&tokenizer, &pages, &mut run);
        assert_eq!(tokens[0].text, "gwida");
        assert_eq!(tokens[0].page, 2);
        assert!(run.diagnostics().is_empty());
    }
}
