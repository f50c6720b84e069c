use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::{Corpus, CrossReference, DictionaryEntry};
use crate::export::Exporter;
use crate::pipeline::RunOutput;

/// Plain-text listing of the corpus for proofreading against the scans.
#[derive(Debug, Clone)]
pub struct TextExporter {
    out_dir: PathBuf,
}

impl TextExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }

    fn format_corpus(corpus: &Corpus) -> String {
        let mut text = String::new();
        for entry in corpus.entries.values() {
            text.push_str(&format_entry(entry));
            text.push('\n');
        }
        text
    }
}

/// One entry as a short block of text:
///
/// ```text
/// aagil [aagil] (noun) · aagal
///   1. elder, old man (aagil tak)
///   2. شيخ
///   -> hadal
///   pages 3-4 of beja-arabic
/// ```
pub fn format_entry(entry: &DictionaryEntry) -> String {
    let mut head = format!(
        "{} [{}] ({})",
        entry.headword,
        entry.id,
        entry.part_of_speech.as_str()
    );
    if !entry.variants.is_empty() {
        let variants: Vec<&str> = entry.variants.iter().map(String::as_str).collect();
        head.push_str(&format!(" · {}", variants.join(", ")));
    }

    let mut lines = vec![head];
    for (idx, sense) in entry.senses.iter().enumerate() {
        let mut line = format!("  {}. {}", idx + 1, sense.gloss);
        if let Some(example) = &sense.example {
            line.push_str(&format!(" ({example})"));
        }
        lines.push(line);
    }
    for reference in &entry.cross_references {
        lines.push(match reference {
            CrossReference::Resolved(id) => format!("  -> {id}"),
            CrossReference::Unresolved { unresolved } => format!("  -> ?{unresolved}"),
        });
    }
    if !entry.issues.is_empty() {
        lines.push(format!("  issues: {}", entry.issues.join(", ")));
    }
    lines.push(format!(
        "  pages {}-{} of {}",
        entry.provenance.page_start, entry.provenance.page_end, entry.provenance.document
    ));
    lines.join("\n") + "\n"
}

impl Exporter for TextExporter {
    fn export(&self, run: &RunOutput) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;

        let mut full_text = String::new();
        match &run.merged {
            Some(merged) => full_text.push_str(&Self::format_corpus(merged)),
            None => {
                for source in &run.sources {
                    full_text.push_str(&format!("=== {} ===\n\n", source.info.name));
                    full_text.push_str(&Self::format_corpus(&source.corpus));
                }
            }
        }

        let full_path = self.out_dir.join("corpus.txt");
        fs::write(full_path, full_text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{EntryProvenance, PartOfSpeech, Sense};
    use pretty_assertions::assert_eq;

    #[test]
    fn formats_entry_block() {
        let entry = DictionaryEntry {
            id: "aagil".to_string(),
            headword: "aagil".to_string(),
            variants: ["aagal".to_string()].into_iter().collect(),
            part_of_speech: PartOfSpeech::Noun,
            senses: vec![Sense {
                gloss: "elder".to_string(),
                example: Some("aagil tak".to_string()),
                language: None,
            }],
            cross_references: vec![
                CrossReference::Resolved("hadal".to_string()),
                CrossReference::unresolved("see nowhere"),
            ],
            regions: Vec::new(),
            gender: None,
            origin: None,
            provenance: EntryProvenance {
                document: "dict1".to_string(),
                page_start: 3,
                page_end: 4,
            },
            issues: vec!["unresolved-cross-reference".to_string()],
        };
        assert_eq!(
            format_entry(&entry),
            "aagil [aagil] (noun) · aagal\n  1. elder (aagil tak)\n  -> hadal\n  -> ?see nowhere\n  issues: unresolved-cross-reference\n  pages 3-4 of dict1\n"
        );
    }
}
