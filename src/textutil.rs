use once_cell::sync::Lazy;
use regex::Regex;

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    WS_RE.replace_all(text.trim(), " ").into_owned()
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn char_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Insert `suffix` before the file extension: `cv.docx` + `_optimized` -> `cv_optimized.docx`.
pub fn with_name_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}{}", &file_name[..dot], suffix, &file_name[dot..]),
        _ => format!("{file_name}{suffix}"),
    }
}
