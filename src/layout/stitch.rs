//! Page-break stitching: a field cut by the end of a page continues as the
//! first token of the next page.

use crate::core::diagnostics::{DiagnosticContext, RunContext, Stage};
use crate::core::model::{Token, TokenRole};

fn continues(previous: &Token, next: &Token) -> bool {
    if !next.joins_previous || next.is_headword_candidate() {
        return false;
    }
    match (previous.role, next.role) {
        (TokenRole::Gloss, TokenRole::Gloss) | (TokenRole::CrossReference, TokenRole::Gloss) => true,
        (TokenRole::Example, TokenRole::Example) | (TokenRole::Example, TokenRole::Gloss) => {
            previous.unclosed
        }
        _ => false,
    }
}

fn merge_into(previous: &mut Token, next: &Token) {
    // a hyphen at the end of a page splits a word, not a phrase
    if let Some(stem) = previous.text.strip_suffix('-') {
        previous.text = format!("{stem}{}", next.text);
    } else {
        previous.text = format!("{} {}", previous.text, next.text);
    }
    previous.last_page = next.last_page;
    previous.unclosed = match next.role {
        TokenRole::Example => next.unclosed,
        _ => previous.unclosed,
    };
}

/// Concatenates per-page token streams, merging the leading continuation
/// token of each page into the last token of the page before it.
pub fn stitch_pages(pages: Vec<Vec<Token>>, run: &mut RunContext) -> Vec<Token> {
    let mut stream: Vec<Token> = Vec::new();
    for tokens in pages {
        let mut tokens = tokens.into_iter();
        let Some(first) = tokens.next() else {
            continue;
        };
        match stream.last_mut() {
            Some(previous) if previous.page != first.page && continues(previous, &first) => {
                run.info(
                    Stage::Tokenize,
                    DiagnosticContext::at(first.page, first.line),
                    format!(
                        "stitched '{}' across the break after page {}",
                        first.text, previous.last_page
                    ),
                );
                merge_into(previous, &first);
            }
            _ => stream.push(first),
        }
        stream.extend(tokens);
    }
    stream
}
