//! Entry segmentation: groups the flat token stream of one source into
//! entry spans.

use crate::core::diagnostics::{DiagnosticContext, RunContext, Stage};
use crate::core::model::{EntrySpan, LayoutKind, Token, TokenRole};

/// Layout-specific positional test for headword candidates.
pub trait EntryBoundary {
    fn layout(&self) -> LayoutKind;

    /// Whether a headword candidate sits where an entry may begin.
    fn opens_entry(&self, token: &Token) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    AwaitingHeadword,
    InEntryBody,
    InExample,
}

struct Segmenter<'a, B: EntryBoundary + ?Sized> {
    source: &'a str,
    boundary: &'a B,
    state: SegmentState,
    current: EntrySpan,
    spans: Vec<EntrySpan>,
    /// (page, line) of the last demoted headword candidate.
    demoted_at: Option<(usize, usize)>,
}

impl<'a, B: EntryBoundary + ?Sized> Segmenter<'a, B> {
    fn new(source: &'a str, boundary: &'a B) -> Self {
        Self {
            source,
            boundary,
            state: SegmentState::AwaitingHeadword,
            current: EntrySpan::new(source, boundary.layout()),
            spans: Vec::new(),
            demoted_at: None,
        }
    }

    fn close(&mut self) {
        if !self.current.is_empty() {
            let fresh = EntrySpan::new(self.source, self.boundary.layout());
            self.spans.push(std::mem::replace(&mut self.current, fresh));
        }
    }

    fn push(&mut self, token: Token, run: &mut RunContext) {
        let demoted_at = self.demoted_at.take();
        // variants printed next to a demoted candidate are body text too
        if token.role == TokenRole::Variant && demoted_at == Some((token.page, token.line)) {
            if let Some(last) = self.current.tokens.last_mut() {
                last.text.push_str(", ");
                last.text.push_str(&token.text);
                self.demoted_at = demoted_at;
                return;
            }
        }

        if token.is_headword_candidate() {
            if self.boundary.opens_entry(&token) {
                // AwaitingHeadword is left as soon as the headword is in
                self.close();
                self.current.tokens.push(token);
                self.state = SegmentState::InEntryBody;
                return;
            }
            run.info(
                Stage::Segment,
                DiagnosticContext::at(token.page, token.line),
                format!(
                    "headword candidate '{}' at column {} kept as body text",
                    token.text, token.column
                ),
            );
            self.demoted_at = Some((token.page, token.line));
            let demoted = token.retagged(TokenRole::Gloss).joined();
            self.push_body(demoted);
            return;
        }
        self.push_body(token);
    }

    fn push_body(&mut self, token: Token) {
        let token = match self.state {
            // a wrapped line inside an open bracket is still example text
            SegmentState::InExample if token.joins_previous && token.role == TokenRole::Gloss => {
                Token {
                    unclosed: true,
                    ..token.retagged(TokenRole::Example)
                }
            }
            _ => token,
        };

        self.state = match (self.state, token.role) {
            (SegmentState::AwaitingHeadword, _) => SegmentState::AwaitingHeadword,
            (_, TokenRole::Example) if token.unclosed => SegmentState::InExample,
            _ => SegmentState::InEntryBody,
        };
        self.current.tokens.push(token);
    }

    fn finish(mut self) -> Vec<EntrySpan> {
        self.close();
        self.spans
    }
}

/// Splits one source's token stream into entry spans. A headword candidate
/// opens a new span only when it passes the layout's positional test;
/// otherwise it is kept as body text of the span it falls in. Tokens before
/// the first headword form a span without a headword, which extraction
/// reports.
pub fn segment<B: EntryBoundary + ?Sized>(
    source: &str,
    tokens: Vec<Token>,
    boundary: &B,
    run: &mut RunContext,
) -> Vec<EntrySpan> {
    let mut segmenter = Segmenter::new(source, boundary);
    for token in tokens {
        segmenter.push(token, run);
    }
    let spans = segmenter.finish();
    tracing::debug!(source, spans = spans.len(), "segmented source");
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Margin(usize);

    impl EntryBoundary for Margin {
        fn layout(&self) -> LayoutKind {
            LayoutKind::Starred
        }

        fn opens_entry(&self, token: &Token) -> bool {
            token.column <= self.0
        }
    }

    fn head(text: &str, line: usize, column: usize) -> Token {
        Token::new(text, TokenRole::Headword, 1, line, column)
    }

    fn gloss(text: &str, line: usize) -> Token {
        Token::new(text, TokenRole::Gloss, 1, line, 0)
    }

    fn texts(span: &EntrySpan) -> Vec<&str> {
        span.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn one_span_per_passing_headword() {
        let tokens = vec![
            head("gwida", 1, 0),
            gloss("many", 1),
            head("hadal", 2, 0),
            gloss("lion", 2),
            head("aagil", 3, 1),
            gloss("elder", 3),
        ];
        let mut run = RunContext::new("dict1");
        let spans = segment("dict1", tokens, &Margin(1), &mut run);
        assert_eq!(spans.len(), 3);
        assert_eq!(texts(&spans[1]), vec!["hadal", "lion"]);
        assert!(run.diagnostics().is_empty());
    }

    #[test]
    fn failing_candidate_is_demoted_not_split() {
        let tokens = vec![
            head("aada", 1, 0),
            gloss("custom of", 1),
            head("elders", 2, 4),
            gloss("عادة", 2),
        ];
        let mut run = RunContext::new("dict1");
        let spans = segment("dict1", tokens, &Margin(1), &mut run);
        assert_eq!(spans.len(), 1);
        let demoted = &spans[0].tokens[2];
        assert_eq!(demoted.role, TokenRole::Gloss);
        assert!(demoted.joins_previous);
        assert_eq!(run.diagnostics().len(), 1);
        assert_eq!(run.diagnostics()[0].stage, Stage::Segment);
    }

    #[test]
    fn variants_of_a_demoted_candidate_stay_in_its_text() {
        let tokens = vec![
            head("gwida", 1, 0),
            gloss("many", 1),
            Token::new("Adj", TokenRole::PartOfSpeech, 1, 1, 0),
            head("hadal", 2, 4),
            Token::new("hadaal", TokenRole::Variant, 1, 2, 4),
            Token::new("lion", TokenRole::Gloss, 1, 2, 4),
            Token::new("hadiil", TokenRole::Variant, 1, 3, 4),
        ];
        let mut run = RunContext::new("dict1");
        let spans = segment("dict1", tokens, &Margin(1), &mut run);
        assert_eq!(spans.len(), 1);
        assert_eq!(
            texts(&spans[0]),
            vec!["gwida", "many", "Adj", "hadal, hadaal", "lion", "hadiil"]
        );
        assert_eq!(spans[0].tokens[3].role, TokenRole::Gloss);
        assert!(spans[0].tokens[3].joins_previous);
        // a variant on another line is left alone
        assert_eq!(spans[0].tokens[5].role, TokenRole::Variant);
    }

    #[test]
    fn leading_body_tokens_form_a_headless_span() {
        let tokens = vec![gloss("orphan text", 1), head("gwida", 2, 0), gloss("many", 2)];
        let mut run = RunContext::new("dict1");
        let spans = segment("dict1", tokens, &Margin(1), &mut run);
        assert_eq!(spans.len(), 2);
        assert!(spans[0].headword_token().is_none());
        assert_eq!(spans[1].headword_token().map(|t| t.text.as_str()), Some("gwida"));
    }

    #[test]
    fn wrapped_lines_inside_open_example_stay_example() {
        let mut open = Token::new("oo rak", TokenRole::Example, 1, 1, 0);
        open.unclosed = true;
        let tokens = vec![
            head("rak", 1, 0),
            gloss("to go", 1),
            open,
            Token::new("wrapped words", TokenRole::Gloss, 1, 2, 4).joined(),
            Token::new("tak", TokenRole::Example, 1, 3, 4).joined(),
            Token::new("and more", TokenRole::Gloss, 1, 3, 4).joined(),
        ];
        let mut run = RunContext::new("dict1");
        let spans = segment("dict1", tokens, &Margin(1), &mut run);
        let roles: Vec<_> = spans[0].tokens.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                TokenRole::Headword,
                TokenRole::Gloss,
                TokenRole::Example,
                TokenRole::Example,
                TokenRole::Example,
                TokenRole::Gloss,
            ]
        );
    }

    #[test]
    fn empty_stream_yields_no_spans() {
        let mut run = RunContext::new("dict1");
        assert!(segment("dict1", Vec::new(), &Margin(1), &mut run).is_empty());
    }
}
