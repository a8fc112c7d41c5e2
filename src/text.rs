//! Text normalization shared by the fuzzy matcher and entity extractor.
//!
//! Both components must see identical tokens for their scores to be
//! comparable, so this is the single tokenization path: lowercase,
//! ASCII-fold, split on non-alphanumerics, light suffix stemming.

/// Normalize free text into comparable lowercase tokens.
///
/// Deterministic and locale-independent. Punctuation acts as a separator,
/// whitespace runs collapse, and each token is stemmed.
pub fn normalize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        let folded = fold_char(c);
        match folded {
            Some(c) => current.push(c),
            None => {
                if !current.is_empty() {
                    tokens.push(stem(&current));
                    current.clear();
                }
            }
        }
    }
    if !current.is_empty() {
        tokens.push(stem(&current));
    }

    tokens
}

/// Normalize and rejoin with single spaces, for whole-string comparison.
pub fn normalize_joined(text: &str) -> String {
    normalize(text).join(" ")
}

/// Lowercase and ASCII-fold a character; None means token separator.
fn fold_char(c: char) -> Option<char> {
    if c.is_ascii_alphanumeric() {
        return Some(c.to_ascii_lowercase());
    }
    if c.is_ascii() {
        return None;
    }
    // Fold the common Latin-1 accented range; anything else separates
    match c {
        'à'..='å' | 'À'..='Å' => Some('a'),
        'è'..='ë' | 'È'..='Ë' => Some('e'),
        'ì'..='ï' | 'Ì'..='Ï' => Some('i'),
        'ò'..='ö' | 'Ò'..='Ö' => Some('o'),
        'ù'..='ü' | 'Ù'..='Ü' => Some('u'),
        'ç' | 'Ç' => Some('c'),
        'ñ' | 'Ñ' => Some('n'),
        _ => None,
    }
}

/// Light suffix stemming: enough to conflate plural/tense variants without
/// a full stemmer. Short words pass through untouched so "done" never
/// collides with "don".
pub fn stem(word: &str) -> String {
    let w = word;
    if let Some(base) = w.strip_suffix("ies")
        && w.len() > 4
    {
        return format!("{}y", base);
    }
    if w.ends_with("sses") {
        return w[..w.len() - 2].to_string();
    }
    if let Some(base) = w.strip_suffix("ing")
        && w.len() > 5
    {
        return base.to_string();
    }
    if let Some(base) = w.strip_suffix("ed")
        && w.len() > 4
    {
        return base.to_string();
    }
    if let Some(base) = w.strip_suffix('s')
        && !w.ends_with("ss")
        && w.len() > 3
    {
        return base.to_string();
    }
    w.to_string()
}
