//! Page text normalization: canonical Unicode, canonical whitespace, page
//! furniture removed. Line breaks and horizontal positions survive because
//! the tokenizers read layout from them; interior runs of spaces are only
//! collapsed once a tokenizer has cut the line into columns.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::config::FurnitureConfig;
use crate::core::diagnostics::{DiagnosticContext, RunContext, Stage};
use crate::core::error::PipelineError;
use crate::core::model::RawPage;
use crate::core::script::is_invisible_mark;

const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone)]
pub struct CompiledFurniture {
    rules: Vec<(Regex, f32)>,
    threshold: f32,
}

impl CompiledFurniture {
    pub fn new(config: &FurnitureConfig, source_id: &str) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&config.threshold) {
            return Err(PipelineError::config(
                source_id,
                format!("furniture threshold {} outside [0, 1]", config.threshold),
            ));
        }
        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            if !(0.0..=1.0).contains(&rule.confidence) {
                return Err(PipelineError::config(
                    source_id,
                    format!(
                        "furniture rule '{}' has confidence {} outside [0, 1]",
                        rule.pattern, rule.confidence
                    ),
                ));
            }
            let regex = Regex::new(&rule.pattern).map_err(|err| {
                PipelineError::config(
                    source_id,
                    format!("furniture pattern '{}' does not compile: {err}", rule.pattern),
                )
            })?;
            rules.push((regex, rule.confidence));
        }
        Ok(Self {
            rules,
            threshold: config.threshold,
        })
    }

    pub fn is_furniture(&self, line: &str) -> bool {
        self.rules
            .iter()
            .any(|(regex, confidence)| *confidence >= self.threshold && regex.is_match(line))
    }
}

/// Normalized text of one page. Stripped lines are kept as blank lines so
/// line numbers still point into the raw page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPage {
    pub source: String,
    pub page_idx: usize,
    pub text: String,
}

impl CleanPage {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Non-blank lines with their 1-based line numbers.
    pub fn lines(&self) -> impl Iterator<Item = (usize, &str)> {
        self.text
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line))
            .filter(|(_, line)| !line.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct PageNormalizer {
    furniture: CompiledFurniture,
}

impl PageNormalizer {
    pub fn new(config: &FurnitureConfig, source_id: &str) -> Result<Self, PipelineError> {
        Ok(Self {
            furniture: CompiledFurniture::new(config, source_id)?,
        })
    }

    pub fn normalize(&self, page: &RawPage, run: &mut RunContext) -> CleanPage {
        let mut stripped = 0usize;
        let lines: Vec<String> = page
            .text
            .lines()
            .map(|raw| {
                let line = normalize_line(raw);
                if !line.is_empty() && self.furniture.is_furniture(&collapse_spaces(&line)) {
                    stripped += 1;
                    String::new()
                } else {
                    line
                }
            })
            .collect();

        let clean = CleanPage {
            source: page.source.clone(),
            page_idx: page.page_idx,
            text: lines.join("\n"),
        };

        if clean.is_empty() {
            let message = if stripped > 0 {
                format!("page is empty after removing {stripped} furniture line(s)")
            } else {
                "page has no text".to_string()
            };
            run.info(Stage::Normalize, DiagnosticContext::page(page.page_idx), message);
            return CleanPage {
                text: String::new(),
                ..clean
            };
        }

        tracing::debug!(
            source = %page.source,
            page = page.page_idx,
            stripped,
            "normalized page"
        );
        clean
    }
}

/// NFKC, invisible marks dropped, tabs expanded to the next tab stop and
/// every other whitespace character turned into a space. Character offsets
/// match the printed page, so column boundaries still apply.
pub fn normalize_line(raw: &str) -> String {
    let text: String = raw
        .chars()
        .filter(|c| !is_invisible_mark(*c))
        .collect::<String>()
        .nfkc()
        .collect();

    let mut line = String::with_capacity(text.len());
    let mut width = 0usize;
    for c in text.chars() {
        match c {
            '\t' => {
                let stop = TAB_WIDTH - width % TAB_WIDTH;
                line.extend(std::iter::repeat(' ').take(stop));
                width += stop;
            }
            c if c.is_whitespace() => {
                line.push(' ');
                width += 1;
            }
            c => {
                line.push(c);
                width += 1;
            }
        }
    }

    if line.trim().is_empty() {
        String::new()
    } else {
        line.trim_end().to_string()
    }
}

/// Leading indentation kept, interior whitespace collapsed to single spaces.
pub fn collapse_spaces(line: &str) -> String {
    let body = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if body.is_empty() {
        String::new()
    } else {
        format!("{}{}", " ".repeat(indent_of(line)), body)
    }
}

/// Width of the leading indentation of an already normalized line.
pub fn indent_of(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}
