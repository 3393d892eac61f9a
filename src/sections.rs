//! Resume section detection over flattened document text.
//!
//! Headings are recognised by an ordered family of keyword groups. Each heuristic used when
//! no heading is present lives in its own function so it can be tested or reordered alone.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::SectionsConfig;
use crate::textutil::is_blank;

pub const HEADING_GROUPS: [&str; 7] = [
    "SUMMARY|OBJECTIVE|PROFILE",
    "EXPERIENCE|EMPLOYMENT|WORK HISTORY",
    "EDUCATION|ACADEMIC|QUALIFICATIONS",
    "SKILLS|EXPERTISE|COMPETENCIES",
    "PROJECTS|PORTFOLIO",
    "CERTIFICATIONS|LICENSES",
    "AWARDS|ACHIEVEMENTS",
];

pub const PERSONAL_DETAILS_LABEL: &str = "PERSONAL DETAILS";
pub const CONTACT_LABEL: &str = "CONTACT";
pub const SUMMARY_LABEL: &str = "SUMMARY";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+").expect("email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\(?\d[\d\s().-]{6,}\d").expect("phone regex"));
static SUMMARY_ADJ_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:experienced|skilled|motivated|dedicated|passionate|results[- ]driven|detail[- ]oriented|accomplished|seasoned|dynamic|proven)\b",
    )
    .expect("summary adjective regex")
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionEntry {
    /// Heading exactly as it appears in the text (trimmed).
    pub label: String,
    /// First content line (0-based line number in the source text).
    pub start_line: usize,
    /// One past the last content line.
    pub end_line: usize,
    /// Content lines joined with `\n`.
    pub content: String,
}

impl SectionEntry {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.lines().filter(|l| !is_blank(l))
    }
}

/// Sections in document order. Labels may repeat; lookups return the first hit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionIndex {
    pub entries: Vec<SectionEntry>,
}

impl SectionIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionEntry> {
        self.entries.iter()
    }

    pub fn get(&self, label: &str) -> Option<&SectionEntry> {
        self.entries.iter().find(|e| e.label == label)
    }

    /// First section whose label contains `label`, ignoring case. A blank label matches nothing.
    pub fn find(&self, label: &str) -> Option<&SectionEntry> {
        let needle = label.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.label.to_lowercase().contains(&needle))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitledSection {
    pub title: String,
    pub content: Vec<String>,
}

pub struct SectionIndexer {
    patterns: Vec<Regex>,
    max_heading_words: usize,
}

impl Default for SectionIndexer {
    fn default() -> Self {
        Self::new(&SectionsConfig::default())
    }
}

impl SectionIndexer {
    pub fn new(cfg: &SectionsConfig) -> Self {
        let mut patterns: Vec<Regex> = HEADING_GROUPS
            .iter()
            .filter_map(|g| heading_regex(g))
            .collect();
        for extra in &cfg.extra_heading_patterns {
            match heading_regex(extra) {
                Some(re) => patterns.push(re),
                None => warn!(pattern = %extra, "ignoring invalid heading pattern"),
            }
        }
        Self {
            patterns,
            max_heading_words: cfg.max_heading_words,
        }
    }

    pub fn is_heading(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || line.split_whitespace().count() > self.max_heading_words {
            return false;
        }
        self.patterns.iter().any(|p| p.is_match(line))
    }

    /// Map every recognised heading to the lines that follow it, up to the next heading.
    pub fn index(&self, text: &str) -> SectionIndex {
        let lines: Vec<&str> = text.split('\n').collect();
        let mut entries: Vec<SectionEntry> = Vec::new();
        let mut current: Option<(String, usize)> = None;

        for (i, line) in lines.iter().enumerate() {
            if !self.is_heading(line) {
                continue;
            }
            if let Some((label, start)) = current.take() {
                entries.push(section_entry(&lines, label, start, i));
            }
            current = Some((line.trim().to_string(), i + 1));
        }
        if let Some((label, start)) = current {
            entries.push(section_entry(&lines, label, start, lines.len()));
        }

        if entries.is_empty() {
            entries = fallback_sections(&lines);
        }
        SectionIndex { entries }
    }

    /// Split text into titled blocks of non-empty trimmed lines. Lines before the first
    /// heading form a `SUMMARY` block.
    pub fn detect_titled_sections(&self, text: &str) -> Vec<TitledSection> {
        let mut sections: Vec<TitledSection> = Vec::new();
        let mut current: Option<TitledSection> = None;

        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if self.is_heading(line) {
                if let Some(done) = current.take() {
                    sections.push(done);
                }
                current = Some(TitledSection {
                    title: line.to_string(),
                    content: Vec::new(),
                });
                continue;
            }
            match current.as_mut() {
                Some(sec) => sec.content.push(line.to_string()),
                None => {
                    current = Some(TitledSection {
                        title: SUMMARY_LABEL.to_string(),
                        content: vec![line.to_string()],
                    })
                }
            }
        }
        if let Some(done) = current {
            sections.push(done);
        }
        sections
    }
}

fn heading_regex(group: &str) -> Option<Regex> {
    let alts: Vec<String> = group
        .split('|')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(regex::escape)
        .collect();
    if alts.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b(?:{})\b", alts.join("|"))).ok()
}

fn section_entry(lines: &[&str], label: String, start: usize, end: usize) -> SectionEntry {
    let start = start.min(end);
    SectionEntry {
        label,
        start_line: start,
        end_line: end,
        content: lines[start..end].join("\n"),
    }
}

fn single_line_entry(lines: &[&str], label: &str, line: usize) -> SectionEntry {
    section_entry(lines, label.to_string(), line, line + 1)
}

fn fallback_sections(lines: &[&str]) -> Vec<SectionEntry> {
    let mut taken: Vec<usize> = Vec::new();
    let mut entries: Vec<SectionEntry> = Vec::new();

    if let Some(i) = personal_details_line(lines) {
        taken.push(i);
        entries.push(single_line_entry(lines, PERSONAL_DETAILS_LABEL, i));
    }
    if let Some(i) = contact_line(lines, &taken) {
        taken.push(i);
        entries.push(single_line_entry(lines, CONTACT_LABEL, i));
    }
    if let Some(i) = summary_line(lines, &taken) {
        entries.push(single_line_entry(lines, SUMMARY_LABEL, i));
    }
    entries.sort_by_key(|e| e.start_line);
    entries
}

/// The first non-empty line usually carries the candidate's name and title.
pub fn personal_details_line(lines: &[&str]) -> Option<usize> {
    lines.iter().position(|l| !is_blank(l))
}

pub fn contact_line(lines: &[&str], taken: &[usize]) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !taken.contains(i))
        .find(|(_, l)| EMAIL_RE.is_match(l) || PHONE_RE.is_match(l))
        .map(|(i, _)| i)
}

pub fn summary_line(lines: &[&str], taken: &[usize]) -> Option<usize> {
    lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !taken.contains(i))
        .find(|(_, l)| SUMMARY_ADJ_RE.is_match(l))
        .map(|(i, _)| i)
}
