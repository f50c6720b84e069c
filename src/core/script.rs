//! Character-class helpers for the script mix found in the sources:
//! Latin-based Beja orthography, Arabic script and English.

use once_cell::sync::Lazy;
use regex::Regex;

static BEJA_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z']*(?:/[a-z])?$").expect("valid Beja word pattern"));

static BEJA_HEADWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z'/\-]{1,30}$").expect("valid Beja headword pattern"));

pub fn is_arabic_char(c: char) -> bool {
    matches!(
        c as u32,
        0x0600..=0x06FF | // Arabic
        0x0750..=0x077F | // Arabic Supplement
        0xFB50..=0xFDFF | // Presentation Forms-A
        0xFE70..=0xFEFF   // Presentation Forms-B
    )
}

pub fn has_arabic(text: &str) -> bool {
    text.chars().any(is_arabic_char)
}

pub fn has_latin(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic())
}

pub fn has_letters(text: &str) -> bool {
    has_latin(text) || has_arabic(text)
}

/// Bare Beja token as printed in a head zone: `aagil`, `ba'ar`, `aabkaab/t`.
pub fn is_beja_word(token: &str) -> bool {
    BEJA_WORD_RE.is_match(token)
}

/// Looser shape accepted for single-column headwords after lowercasing.
pub fn is_beja_headword_shape(token: &str) -> bool {
    BEJA_HEADWORD_RE.is_match(token)
}

/// Characters of the romanized Beja alphabet as printed in headwords.
pub fn is_beja_alphabet(c: char) -> bool {
    c.is_ascii_lowercase() || matches!(c, '\'' | '/' | '-' | ' ')
}

/// Bidi controls and zero-width marks OCR output tends to attach to numbers
/// and Arabic runs.
pub fn is_invisible_mark(c: char) -> bool {
    matches!(
        c,
        '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{200E}' | '\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{FEFF}'
    )
}
