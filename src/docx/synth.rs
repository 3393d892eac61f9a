use crate::docx::model::{extract_font, FontSpec};
use crate::docx::xml::{escape_attr, write_events, XmlEvent};

#[derive(Clone, Debug, Default)]
pub struct ParagraphSynth {
    pub fallback_font: FontSpec,
}

impl ParagraphSynth {
    pub fn new(fallback_font: FontSpec) -> Self {
        Self { fallback_font }
    }

    pub fn make_paragraph(&self, text: &str, style: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let font = extract_font(style, &self.fallback_font);
        let mut out = String::from("<w:p>");
        out.push_str(style);
        out.push_str(&write_events(&run_events(text, &font)));
        out.push_str("</w:p>");
        Some(out)
    }

    pub fn make_paragraphs<'a>(&self, lines: impl IntoIterator<Item = &'a str>, style: &str) -> String {
        lines
            .into_iter()
            .filter_map(|line| self.make_paragraph(line, style))
            .collect()
    }
}

fn run_events(text: &str, font: &FontSpec) -> Vec<XmlEvent> {
    let family = escape_attr(&font.family);
    let mut t_attrs: Vec<(String, String)> = Vec::new();
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        t_attrs.push(("xml:space".to_string(), "preserve".to_string()));
    }
    vec![
        XmlEvent::Start {
            name: "w:r".to_string(),
            attrs: Vec::new(),
        },
        XmlEvent::Start {
            name: "w:rPr".to_string(),
            attrs: Vec::new(),
        },
        XmlEvent::Empty {
            name: "w:rFonts".to_string(),
            attrs: vec![
                ("w:ascii".to_string(), family.clone()),
                ("w:hAnsi".to_string(), family),
            ],
        },
        XmlEvent::Empty {
            name: "w:sz".to_string(),
            attrs: vec![("w:val".to_string(), font.size_half_points.to_string())],
        },
        XmlEvent::End {
            name: "w:rPr".to_string(),
        },
        XmlEvent::Start {
            name: "w:t".to_string(),
            attrs: t_attrs,
        },
        XmlEvent::Text {
            text: text.to_string(),
        },
        XmlEvent::End {
            name: "w:t".to_string(),
        },
        XmlEvent::End {
            name: "w:r".to_string(),
        },
    ]
}
