use super::{splice, Attempt};
use crate::sections::SectionEntry;
use crate::similarity::similarity;
use crate::textutil::{char_len, char_prefix, normalize_whitespace};

/// Rewrite the paragraph of the first claimed-section line that is similar to the target.
pub(super) fn section_fuzzy(a: &Attempt<'_>) -> anyhow::Result<Option<String>> {
    let Some(section) = a.index.find(a.section) else {
        return Ok(None);
    };
    let threshold = a.resolver.cfg.similarity_threshold;
    Ok(rewrite_first(a, section, |line| similarity(line, a.target) > threshold))
}

/// Rewrite the paragraph of the first claimed-section line whose length is close to the
/// target's. Length says little about content, so this runs last.
pub(super) fn section_length(a: &Attempt<'_>) -> anyhow::Result<Option<String>> {
    let Some(section) = a.index.find(a.section) else {
        return Ok(None);
    };
    let target_len = char_len(a.target) as f64;
    if target_len == 0.0 {
        return Ok(None);
    }
    let tolerance = a.resolver.cfg.length_tolerance;
    Ok(rewrite_first(a, section, |line| {
        (char_len(line) as f64 - target_len).abs() / target_len < tolerance
    }))
}

fn rewrite_first(
    a: &Attempt<'_>,
    section: &SectionEntry,
    qualifies: impl Fn(&str) -> bool,
) -> Option<String> {
    section
        .lines()
        .map(str::trim)
        .filter(|line| qualifies(line))
        .find_map(|line| rewrite_line_paragraph(a, line))
}

/// Replace the first paragraph whose visible text contains the opening of `line`.
fn rewrite_line_paragraph(a: &Attempt<'_>, line: &str) -> Option<String> {
    let prefix = normalize_whitespace(char_prefix(line, a.resolver.cfg.line_prefix_chars));
    if prefix.is_empty() {
        return None;
    }
    let p = a
        .tree
        .leaf_paragraphs()
        .find(|p| a.tree.visible_text(p).contains(&prefix))?;
    let style = a.tree.paragraph_style(p, a.xml);
    let new_paragraph = a.resolver.synth.make_paragraph(a.replacement, style)?;
    Some(splice(a.xml, a.tree.paragraph_range(p), &new_paragraph))
}
