//! Table-driven OCR confusable correction for the Beja / Arabic script mix.

use std::collections::BTreeMap;

use crate::core::script::is_beja_alphabet;

/// Which script a piece of text is expected to be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptHint {
    Beja,
    Arabic,
    Latin,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correction {
    pub text: String,
    pub substitutions: usize,
    /// Characters still outside the expected alphabet after correction.
    pub unknown: Vec<char>,
}

impl Correction {
    pub fn is_clean(&self) -> bool {
        self.unknown.is_empty()
    }
}

pub trait OcrCorrector {
    fn correct(&self, text: &str, hint: ScriptHint) -> Correction;
}

/// Substitution tables per script; `None` deletes the character.
#[derive(Debug, Clone)]
pub struct TableCorrector {
    homoglyphs: BTreeMap<char, Option<char>>,
    arabic: BTreeMap<char, Option<char>>,
    digits: BTreeMap<char, char>,
}

impl Default for TableCorrector {
    fn default() -> Self {
        let homoglyphs = [
            // Cyrillic lookalikes
            ('а', Some('a')),
            ('е', Some('e')),
            ('о', Some('o')),
            ('р', Some('p')),
            ('с', Some('c')),
            ('у', Some('y')),
            ('х', Some('x')),
            ('і', Some('i')),
            ('ј', Some('j')),
            ('ѕ', Some('s')),
            ('ı', Some('i')),
            // apostrophes and glottal-stop marks
            ('’', Some('\'')),
            ('‘', Some('\'')),
            ('ʼ', Some('\'')),
            ('ʻ', Some('\'')),
            ('`', Some('\'')),
            ('´', Some('\'')),
        ]
        .into_iter()
        .collect();

        let arabic = [
            ('ی', Some('ي')),
            ('ک', Some('ك')),
            ('ہ', Some('ه')),
            // tatweel
            ('ـ', None),
        ]
        .into_iter()
        .collect();

        let digits = [('0', 'o'), ('1', 'l'), ('|', 'l')].into_iter().collect();

        Self {
            homoglyphs,
            arabic,
            digits,
        }
    }
}

impl TableCorrector {
    fn substitute(
        table: &BTreeMap<char, Option<char>>,
        text: &str,
        substitutions: &mut usize,
    ) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match table.get(&c) {
                Some(Some(to)) => {
                    *substitutions += 1;
                    out.push(*to);
                }
                Some(None) => *substitutions += 1,
                None => out.push(c),
            }
        }
        out
    }

    /// Digits inside a word that otherwise has letters are misread letters;
    /// a bare number is left alone.
    fn fix_digits(&self, text: &str, substitutions: &mut usize) -> String {
        text.split(' ')
            .map(|word| {
                if !word.chars().any(|c| c.is_ascii_alphabetic()) {
                    return word.to_string();
                }
                word.chars()
                    .map(|c| match self.digits.get(&c) {
                        Some(to) => {
                            *substitutions += 1;
                            *to
                        }
                        None => c,
                    })
                    .collect()
            })
            .collect::<Vec<String>>()
            .join(" ")
    }
}

impl OcrCorrector for TableCorrector {
    fn correct(&self, text: &str, hint: ScriptHint) -> Correction {
        let mut substitutions = 0;
        let text = match hint {
            ScriptHint::Beja => {
                let text = Self::substitute(&self.homoglyphs, text, &mut substitutions);
                self.fix_digits(&text, &mut substitutions)
            }
            ScriptHint::Latin => Self::substitute(&self.homoglyphs, text, &mut substitutions),
            ScriptHint::Arabic => Self::substitute(&self.arabic, text, &mut substitutions),
        };

        let mut unknown = Vec::new();
        if hint == ScriptHint::Beja {
            for c in text.chars() {
                if !is_beja_alphabet(c) && !unknown.contains(&c) {
                    unknown.push(c);
                }
            }
        }

        Correction {
            text,
            substitutions,
            unknown,
        }
    }
}
