use crate::docx::xml::{find_attr, XmlEvent, XmlPart};

pub(crate) fn control_append(buf: &mut String, name: &str, attrs: &[(String, String)]) {
    match name {
        "w:tab" | "w:ptab" => buf.push('\t'),
        "w:cr" => buf.push('\n'),
        "w:br" => {
            let br_type = find_attr(attrs, "w:type");
            if br_type.unwrap_or("textWrapping") == "textWrapping" {
                buf.push('\n');
            }
        }
        "w:noBreakHyphen" => buf.push('-'),
        _ => {}
    }
}

// One line per paragraph. Text-box paragraphs come out before their host.
pub fn flatten_text(part: &XmlPart) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut stack: Vec<&str> = Vec::new();
    // Text buffers of the currently open paragraphs, innermost last.
    let mut open: Vec<String> = Vec::new();

    for ev in &part.events {
        match ev {
            XmlEvent::Start { name, .. } => {
                if name == "w:p" {
                    open.push(String::new());
                }
                stack.push(name.as_str());
            }
            XmlEvent::Empty { name, attrs } => {
                if name == "w:p" {
                    lines.push(String::new());
                } else if stack.last() == Some(&"w:r") {
                    if let Some(buf) = open.last_mut() {
                        control_append(buf, name, attrs);
                    }
                }
            }
            XmlEvent::Text { text } => {
                if stack.last() == Some(&"w:t") {
                    if let Some(buf) = open.last_mut() {
                        buf.push_str(text);
                    }
                }
            }
            XmlEvent::End { name } => {
                if name == "w:p" {
                    if let Some(buf) = open.pop() {
                        lines.push(buf);
                    }
                }
                let _ = stack.pop();
            }
            _ => {}
        }
    }
    lines.join("\n")
}

pub fn extract_text(xml: &str) -> anyhow::Result<String> {
    let part = XmlPart::parse("document", xml)?;
    Ok(flatten_text(&part))
}
