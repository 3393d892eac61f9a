use anyhow::anyhow;
use quick_xml::escape::unescape;

use super::{splice, Attempt};
use crate::docx::model::TextNode;
use crate::docx::xml::{escape_text, write_start_like, XmlEvent, XmlPart};

/// Replace the first occurrence of the target inside the first `<w:t>` that holds it whole.
/// Only the characters of that text node change (plus `xml:space` when edge whitespace
/// appears), so every other byte of the document is kept.
pub(super) fn exact_run(a: &Attempt<'_>) -> anyhow::Result<Option<String>> {
    let Some(node) = a
        .tree
        .paragraphs
        .iter()
        .flat_map(|p| p.text_nodes.iter())
        .filter(|n| a.tree.node_text(n).contains(a.target))
        .min_by_key(|n| n.elem_event)
    else {
        return Ok(None);
    };
    let Some(text_event) = node.text_event else {
        return Ok(None);
    };

    let text = a.tree.node_text(node);
    let new_text = text.replacen(a.target, a.replacement, 1);
    let text_span = a.part.spans[text_event].clone();
    let raw = &a.xml[text_span.clone()];
    let new_raw = splice_raw(raw, a.target, a.replacement, &new_text);

    let mut out = splice(a.xml, text_span, &new_raw);
    if needs_preserve(&new_text) && !a.tree.text_node_has_preserve(node) {
        let start_span = a.part.spans[node.elem_event].clone();
        out = splice(&out, start_span, &preserved_start_tag(a.part, node)?);
    }

    let reparsed = XmlPart::parse(&a.part.name, &out)?;
    if !a.part.structure_unchanged(&reparsed) {
        return Err(anyhow!("in-run replacement changed document structure"));
    }
    Ok(Some(out))
}

/// Swap the escaped target for the escaped replacement inside the raw node text, falling
/// back to re-escaping the whole node when the raw bytes use other entity spellings.
fn splice_raw(raw: &str, target: &str, replacement: &str, expected: &str) -> String {
    let escaped_target = escape_text(target);
    if let Some(pos) = raw.find(&escaped_target) {
        let candidate = format!(
            "{}{}{}",
            &raw[..pos],
            escape_text(replacement),
            &raw[pos + escaped_target.len()..]
        );
        if unescape(&candidate).is_ok_and(|t| t == expected) {
            return candidate;
        }
    }
    escape_text(expected)
}

fn needs_preserve(text: &str) -> bool {
    text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace)
}

fn preserved_start_tag(part: &XmlPart, node: &TextNode) -> anyhow::Result<String> {
    let XmlEvent::Start { name, attrs } = &part.events[node.elem_event] else {
        return Err(anyhow!("text node does not start with an element"));
    };
    let mut attrs = attrs.clone();
    attrs.retain(|(k, _)| k != "xml:space");
    attrs.push(("xml:space".to_string(), "preserve".to_string()));
    let mut out = String::new();
    write_start_like(&mut out, name, &attrs, false);
    Ok(out)
}
