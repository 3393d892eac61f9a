use std::ops::Range;

use quick_xml::escape::unescape;

use crate::docx::extract::control_append;
use crate::docx::xml::{find_attr, XmlEvent, XmlPart};
use crate::textutil::normalize_whitespace;

// `text_event` is None for `<w:t/>` and `<w:t></w:t>`.
#[derive(Clone, Debug)]
pub struct TextNode {
    pub elem_event: usize,
    pub text_event: Option<usize>,
    pub end_event: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct Paragraph {
    pub start_event: usize,
    pub end_event: usize,
    pub ppr_events: Option<(usize, usize)>,
    pub text_nodes: Vec<TextNode>,
    pub run_count: usize,
    pub has_nested: bool,
    pub parent: String,
}

pub struct DocumentTree<'a> {
    pub part: &'a XmlPart,
    pub paragraphs: Vec<Paragraph>,
}

impl<'a> DocumentTree<'a> {
    pub fn build(part: &'a XmlPart) -> Self {
        let mut paragraphs: Vec<Paragraph> = Vec::new();
        let mut stack: Vec<&str> = Vec::new();
        // Indices into `paragraphs` of the currently open `<w:p>` elements.
        let mut open: Vec<usize> = Vec::new();
        // `<w:pPr>` start event and the stack depth it was opened at.
        let mut open_ppr: Option<(usize, usize)> = None;
        let mut open_t: Option<TextNode> = None;

        for (idx, ev) in part.events.iter().enumerate() {
            match ev {
                XmlEvent::Start { name, .. } => {
                    let parent = stack.last().copied().unwrap_or("");
                    match name.as_str() {
                        "w:p" => {
                            if let Some(&outer) = open.last() {
                                paragraphs[outer].has_nested = true;
                            }
                            open.push(paragraphs.len());
                            paragraphs.push(Paragraph {
                                start_event: idx,
                                end_event: idx,
                                ppr_events: None,
                                text_nodes: Vec::new(),
                                run_count: 0,
                                has_nested: false,
                                parent: parent.to_string(),
                            });
                        }
                        "w:pPr" if parent == "w:p" => open_ppr = Some((idx, stack.len())),
                        "w:r" => {
                            if let Some(&p) = open.last() {
                                paragraphs[p].run_count += 1;
                            }
                        }
                        "w:t" if parent == "w:r" => {
                            open_t = Some(TextNode {
                                elem_event: idx,
                                text_event: None,
                                end_event: None,
                            });
                        }
                        _ => {}
                    }
                    stack.push(name.as_str());
                }
                XmlEvent::Empty { name, .. } => {
                    let parent = stack.last().copied().unwrap_or("");
                    match name.as_str() {
                        "w:pPr" if parent == "w:p" => {
                            if let Some(&p) = open.last() {
                                paragraphs[p].ppr_events = Some((idx, idx));
                            }
                        }
                        "w:r" => {
                            if let Some(&p) = open.last() {
                                paragraphs[p].run_count += 1;
                            }
                        }
                        "w:t" if parent == "w:r" => {
                            if let Some(&p) = open.last() {
                                paragraphs[p].text_nodes.push(TextNode {
                                    elem_event: idx,
                                    text_event: None,
                                    end_event: None,
                                });
                            }
                        }
                        _ => {}
                    }
                }
                XmlEvent::Text { .. } => {
                    if let Some(t) = open_t.as_mut() {
                        if t.text_event.is_none() {
                            t.text_event = Some(idx);
                        }
                    }
                }
                XmlEvent::End { name } => {
                    match name.as_str() {
                        "w:p" => {
                            if let Some(p) = open.pop() {
                                paragraphs[p].end_event = idx;
                            }
                        }
                        "w:pPr" => {
                            if let (Some((first, depth)), Some(&p)) = (open_ppr, open.last()) {
                                if depth + 1 == stack.len() {
                                    paragraphs[p].ppr_events = Some((first, idx));
                                    open_ppr = None;
                                }
                            }
                        }
                        "w:t" => {
                            if let (Some(mut t), Some(&p)) = (open_t.take(), open.last()) {
                                t.end_event = Some(idx);
                                paragraphs[p].text_nodes.push(t);
                            }
                        }
                        _ => {}
                    }
                    let _ = stack.pop();
                }
                _ => {}
            }
        }

        Self { part, paragraphs }
    }

    pub fn leaf_paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.paragraphs.iter().filter(|p| !p.has_nested)
    }

    pub fn paragraph_range(&self, p: &Paragraph) -> Range<usize> {
        self.part.byte_range(p.start_event, p.end_event)
    }

    pub fn node_text(&self, node: &TextNode) -> &str {
        match node.text_event.map(|i| &self.part.events[i]) {
            Some(XmlEvent::Text { text }) => text.as_str(),
            _ => "",
        }
    }

    // Run text plus tabs and breaks, the same way `flatten_text` renders a line.
    pub fn raw_text(&self, p: &Paragraph) -> String {
        let mut stack: Vec<&str> = Vec::new();
        let mut out = String::new();
        for ev in &self.part.events[p.start_event..=p.end_event] {
            match ev {
                XmlEvent::Start { name, .. } => stack.push(name.as_str()),
                XmlEvent::End { .. } => {
                    let _ = stack.pop();
                }
                XmlEvent::Empty { name, attrs } if stack.last() == Some(&"w:r") => {
                    control_append(&mut out, name, attrs)
                }
                XmlEvent::Text { text } if stack.last() == Some(&"w:t") => out.push_str(text),
                _ => {}
            }
        }
        out
    }

    pub fn visible_text(&self, p: &Paragraph) -> String {
        normalize_whitespace(&self.raw_text(p))
    }

    pub fn paragraph_style<'s>(&self, p: &Paragraph, source: &'s str) -> &'s str {
        match p.ppr_events {
            Some((first, last)) => &source[self.part.byte_range(first, last)],
            None => "",
        }
    }

    pub fn text_node_has_preserve(&self, node: &TextNode) -> bool {
        match &self.part.events[node.elem_event] {
            XmlEvent::Start { attrs, .. } | XmlEvent::Empty { attrs, .. } => {
                find_attr(attrs, "xml:space") == Some("preserve")
            }
            _ => false,
        }
    }
}

pub fn extract_visible_text(fragment: &str) -> anyhow::Result<String> {
    let part = XmlPart::parse("fragment", fragment)?;
    let mut stack: Vec<&str> = Vec::new();
    let mut out = String::new();
    for ev in &part.events {
        match ev {
            XmlEvent::Start { name, .. } => stack.push(name.as_str()),
            XmlEvent::End { .. } => {
                let _ = stack.pop();
            }
            XmlEvent::Text { text } if stack.last() == Some(&"w:t") => out.push_str(text),
            _ => {}
        }
    }
    Ok(normalize_whitespace(&out))
}

pub fn extract_paragraph_style(paragraph: &str) -> anyhow::Result<String> {
    let part = XmlPart::parse("fragment", paragraph)?;
    let tree = DocumentTree::build(&part);
    Ok(tree
        .paragraphs
        .first()
        .map(|p| tree.paragraph_style(p, paragraph).to_string())
        .unwrap_or_default())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontSpec {
    pub family: String,
    pub size_half_points: u32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            family: "Calibri".to_string(),
            size_half_points: 22,
        }
    }
}

pub fn extract_font(style: &str, fallback: &FontSpec) -> FontSpec {
    let mut font = fallback.clone();
    if style.trim().is_empty() {
        return font;
    }
    let Ok(part) = XmlPart::parse("style", style) else {
        return font;
    };
    let mut family: Option<String> = None;
    let mut size: Option<u32> = None;
    for ev in &part.events {
        let (XmlEvent::Start { name, attrs } | XmlEvent::Empty { name, attrs }) = ev else {
            continue;
        };
        match name.as_str() {
            "w:rFonts" if family.is_none() => {
                family = find_attr(attrs, "w:ascii")
                    .map(|raw| unescape(raw).map(|v| v.trim().to_string()).unwrap_or_default())
                    .filter(|v| !v.is_empty());
            }
            "w:sz" if size.is_none() => {
                size = find_attr(attrs, "w:val").and_then(|v| v.trim().parse::<u32>().ok());
            }
            _ => {}
        }
    }
    if let Some(f) = family {
        font.family = f;
    }
    if let Some(s) = size {
        font.size_half_points = s;
    }
    font
}
