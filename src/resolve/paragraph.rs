use super::{splice, Attempt};
use crate::textutil::normalize_whitespace;

/// The target spans several runs of one paragraph: rebuild that paragraph as a single run,
/// keeping its `<w:pPr>`. Inline formatting inside the paragraph is lost.
pub(super) fn cross_run(a: &Attempt<'_>) -> anyhow::Result<Option<String>> {
    let target = normalize_whitespace(a.target);
    if target.is_empty() || !normalize_whitespace(a.flattened).contains(&target) {
        return Ok(None);
    }

    let Some((p, visible)) = a
        .tree
        .leaf_paragraphs()
        .map(|p| (p, a.tree.visible_text(p)))
        .find(|(_, visible)| visible.contains(&target))
    else {
        return Ok(None);
    };

    let new_text = visible.replacen(&target, a.replacement, 1);
    let style = a.tree.paragraph_style(p, a.xml);
    // A paragraph emptied by the edit would be left without runs; treat as no match.
    let Some(new_paragraph) = a.resolver.synth.make_paragraph(&new_text, style) else {
        return Ok(None);
    };
    Ok(Some(splice(a.xml, a.tree.paragraph_range(p), &new_paragraph)))
}
