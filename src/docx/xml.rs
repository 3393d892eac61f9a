use std::collections::BTreeMap;
use std::ops::Range;

use anyhow::Context;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sha2::{Digest, Sha256};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum XmlEvent {
    Decl {
        raw: String,
    },
    Start {
        name: String,
        attrs: Vec<(String, String)>,
    },
    End {
        name: String,
    },
    Empty {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text {
        text: String,
    },
    CData {
        text: String,
    },
    Comment {
        text: String,
    },
    PI {
        content: String,
    },
    DocType {
        text: String,
    },
}

// `events[i]` was read from `spans[i]` of the source string.
#[derive(Clone, Debug)]
pub struct XmlPart {
    pub name: String,
    pub events: Vec<XmlEvent>,
    pub spans: Vec<Range<usize>>,
    pub baseline_hash: String,
}

impl XmlPart {
    pub fn parse(name: &str, xml: &str) -> anyhow::Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut events: Vec<XmlEvent> = Vec::new();
        let mut spans: Vec<Range<usize>> = Vec::new();
        loop {
            let start = reader.buffer_position() as usize;
            let ev = reader
                .read_event()
                .with_context(|| format!("read xml event in {name} at byte {start}"))?;
            let end = reader.buffer_position() as usize;
            let event = match ev {
                Event::Eof => break,
                Event::Decl(_) => XmlEvent::Decl {
                    raw: xml[start..end].to_string(),
                },
                Event::Start(s) => XmlEvent::Start {
                    name: bytes_to_string(s.name().as_ref()),
                    attrs: collect_attrs(&s)?,
                },
                Event::End(e) => XmlEvent::End {
                    name: bytes_to_string(e.name().as_ref()),
                },
                Event::Empty(s) => XmlEvent::Empty {
                    name: bytes_to_string(s.name().as_ref()),
                    attrs: collect_attrs(&s)?,
                },
                Event::Text(t) => XmlEvent::Text {
                    text: t.unescape().context("unescape text")?.into_owned(),
                },
                Event::CData(t) => XmlEvent::CData {
                    text: bytes_to_string(t.into_inner()),
                },
                Event::Comment(t) => XmlEvent::Comment {
                    text: bytes_to_string(t.into_inner()),
                },
                Event::PI(t) => XmlEvent::PI {
                    content: format!(
                        "{}{}",
                        bytes_to_string(t.target()),
                        bytes_to_string(t.content())
                    ),
                },
                Event::DocType(t) => XmlEvent::DocType {
                    text: bytes_to_string(t.into_inner()),
                },
            };
            events.push(event);
            spans.push(start..end);
        }

        let baseline_hash = structure_hash(&events);
        Ok(Self {
            name: name.to_string(),
            events,
            spans,
            baseline_hash,
        })
    }

    pub fn byte_range(&self, first: usize, last: usize) -> Range<usize> {
        self.spans[first].start..self.spans[last].end
    }

    pub fn structure_unchanged(&self, other: &XmlPart) -> bool {
        self.baseline_hash == other.baseline_hash
    }
}

fn collect_attrs(s: &BytesStart<'_>) -> anyhow::Result<Vec<(String, String)>> {
    let mut attrs: Vec<(String, String)> = Vec::new();
    for a in s.attributes() {
        let a = a.context("attr")?;
        let key = bytes_to_string(a.key.as_ref());
        // Raw (still-escaped) value; written back as-is.
        let val = bytes_to_string(a.value.as_ref());
        attrs.push((key, val));
    }
    Ok(attrs)
}

fn bytes_to_string(bytes: impl AsRef<[u8]>) -> String {
    String::from_utf8_lossy(bytes.as_ref()).into_owned()
}

pub fn find_attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

pub fn write_start_like(out: &mut String, name: &str, attrs: &[(String, String)], empty: bool) {
    out.push('<');
    out.push_str(name);
    // Attribute values are stored as raw (already-escaped) XML. Do NOT escape again.
    for (k, v) in attrs {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(v);
        out.push('"');
    }
    if empty {
        out.push_str("/>");
    } else {
        out.push('>');
    }
}

pub fn write_events(events: &[XmlEvent]) -> String {
    let mut out = String::new();
    for ev in events {
        match ev {
            XmlEvent::Decl { raw } => out.push_str(raw),
            XmlEvent::Start { name, attrs } => write_start_like(&mut out, name, attrs, false),
            XmlEvent::End { name } => {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
            XmlEvent::Empty { name, attrs } => write_start_like(&mut out, name, attrs, true),
            XmlEvent::Text { text } => out.push_str(&escape_text(text)),
            XmlEvent::CData { text } => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            XmlEvent::Comment { text } => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            XmlEvent::PI { content } => {
                out.push_str("<?");
                out.push_str(content);
                out.push_str("?>");
            }
            XmlEvent::DocType { text } => {
                out.push_str("<!DOCTYPE");
                out.push_str(text);
                out.push('>');
            }
        }
    }
    out
}

pub fn structure_hash(events: &[XmlEvent]) -> String {
    let mut hasher = Sha256::new();
    let mut stack: Vec<&str> = Vec::new();

    for ev in events {
        match ev {
            XmlEvent::Start { name, attrs } => {
                stack.push(name.as_str());
                hash_start_like(&mut hasher, name, attrs);
            }
            XmlEvent::Empty { name, attrs } => {
                hash_start_like(&mut hasher, name, attrs);
                hash_end_like(&mut hasher, name);
            }
            XmlEvent::End { name } => {
                hash_end_like(&mut hasher, name);
                let _ = stack.pop();
            }
            XmlEvent::Text { text } => {
                let cur = stack.last().copied().unwrap_or("");
                if is_text_tag(cur) {
                    continue;
                }
                hasher.update(b"T:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::Decl { raw } => {
                hasher.update(b"D:");
                hasher.update(raw.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::CData { text } => {
                hasher.update(b"C:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::Comment { text } => {
                hasher.update(b"M:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::PI { content } => {
                hasher.update(b"P:");
                hasher.update(content.as_bytes());
                hasher.update(b"\n");
            }
            XmlEvent::DocType { text } => {
                hasher.update(b"Y:");
                hasher.update(text.as_bytes());
                hasher.update(b"\n");
            }
        }
    }
    hex::encode(hasher.finalize())
}

pub fn is_text_tag(name: &str) -> bool {
    name == "w:t"
}

fn hash_start_like(hasher: &mut Sha256, name: &str, attrs: &[(String, String)]) {
    hasher.update(b"S:");
    hasher.update(name.as_bytes());
    hasher.update(b"|");

    let mut map: BTreeMap<&str, &str> = BTreeMap::new();
    for (k, v) in attrs {
        if k == "xml:space" {
            continue;
        }
        map.insert(k.as_str(), v.as_str());
    }
    for (k, v) in map {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b";");
    }
    hasher.update(b"\n");
}

fn hash_end_like(hasher: &mut Sha256, name: &str) {
    hasher.update(b"E:");
    hasher.update(name.as_bytes());
    hasher.update(b"\n");
}
