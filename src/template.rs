//! Filling `{{TITLE}}` placeholders of a template document with section content, plus the
//! on-disk template catalog (`<dir>/index.json` and `<dir>/<id>.docx`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PatcherConfig;
use crate::docx::model::{DocumentTree, Paragraph};
use crate::docx::synth::ParagraphSynth;
use crate::docx::xml::XmlPart;
use crate::error::{PatchError, Result};
use crate::patch::MainDocument;
use crate::sections::TitledSection;
use crate::textutil::with_name_suffix;

pub const TEMPLATE_SUFFIX: &str = "_template";
pub const TEMPLATE_INDEX_FILE: &str = "index.json";

pub fn placeholder_token(title: &str) -> String {
    format!("{{{{{}}}}}", title.trim().to_uppercase())
}

/// `resume.docx` -> `resume_template.docx`.
pub fn template_file_name(file_name: &str) -> String {
    with_name_suffix(file_name, TEMPLATE_SUFFIX)
}

pub struct TemplateBinder {
    main_part: String,
    synth: ParagraphSynth,
}

impl Default for TemplateBinder {
    fn default() -> Self {
        Self::from_config(&PatcherConfig::default())
    }
}

impl TemplateBinder {
    pub fn from_config(cfg: &PatcherConfig) -> Self {
        Self {
            main_part: cfg.package.main_part.clone(),
            synth: ParagraphSynth::new(cfg.synth.font()),
        }
    }

    /// Replace each section's placeholder paragraph with one paragraph per content line.
    /// Sections whose placeholder is absent are skipped.
    pub fn bind(&self, template: &[u8], sections: &[TitledSection]) -> Result<Vec<u8>> {
        let doc = MainDocument::open(template, &self.main_part)?;
        let mut xml = doc.xml.clone();
        for section in sections {
            let token = placeholder_token(&section.title);
            match self.bind_section(&xml, &token, section)? {
                Some(bound) => {
                    debug!(placeholder = %token, lines = section.content.len(), "placeholder bound");
                    xml = bound;
                }
                None => warn!(placeholder = %token, "placeholder not found in template; section skipped"),
            }
        }
        doc.to_bytes_with(&xml)
    }

    pub fn bind_section(&self, xml: &str, token: &str, section: &TitledSection) -> Result<Option<String>> {
        let part = XmlPart::parse(&self.main_part, xml).map_err(|reason| PatchError::Xml {
            part: self.main_part.clone(),
            reason,
        })?;
        let tree = DocumentTree::build(&part);
        let hits: Vec<&Paragraph> = tree
            .leaf_paragraphs()
            .filter(|p| tree.raw_text(p).contains(token))
            .collect();
        if hits.is_empty() {
            return Ok(None);
        }

        let replacement = self
            .synth
            .make_paragraphs(section.content.iter().map(String::as_str), "");
        let mut out = xml.to_string();
        for p in hits.into_iter().rev() {
            let range = tree.paragraph_range(p);
            if replacement.is_empty() && p.parent == "w:tc" {
                // A table cell must keep at least one paragraph.
                let kept = format!("<w:p>{}</w:p>", tree.paragraph_style(p, xml));
                out.replace_range(range, &kept);
            } else {
                out.replace_range(range, &replacement);
            }
        }
        Ok(Some(out))
    }
}

/// Bind with the default configuration.
pub fn bind(template: &[u8], sections: &[TitledSection]) -> Result<Vec<u8>> {
    TemplateBinder::default().bind(template, sections)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
}

pub struct TemplateCatalog {
    dir: PathBuf,
    pub templates: Vec<TemplateInfo>,
}

impl TemplateCatalog {
    pub fn load(dir: &Path) -> Result<Self> {
        let index_path = dir.join(TEMPLATE_INDEX_FILE);
        let text = std::fs::read_to_string(&index_path)?;
        let templates: Vec<TemplateInfo> = serde_json::from_str(&text)
            .map_err(|e| PatchError::Template(format!("{}: {e}", index_path.display())))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            templates,
        })
    }

    pub fn get(&self, id: &str) -> Option<&TemplateInfo> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn template_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.docx"))
    }

    pub fn read_template(&self, id: &str) -> Result<Vec<u8>> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(PatchError::Template(format!("invalid template id: {id:?}")));
        }
        let path = self.template_path(id);
        std::fs::read(&path)
            .map_err(|e| PatchError::Template(format!("failed to load template {id}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::model::extract_visible_text;
    use crate::docx::package::testing::{build_docx, document_xml, CONTENT_TYPES};

    fn skills(content: &[&str]) -> TitledSection {
        TitledSection {
            title: "Skills".to_string(),
            content: content.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn bound_xml(template_body: &str, sections: &[TitledSection]) -> String {
        let template = build_docx(&[
            ("[Content_Types].xml", CONTENT_TYPES),
            ("word/document.xml", &document_xml(template_body)),
        ]);
        let out = bind(&template, sections).expect("bind");
        MainDocument::open(&out, "word/document.xml").expect("open").xml
    }

    #[test]
    fn placeholder_becomes_one_paragraph_per_line() {
        let xml = bound_xml(
            concat!(
                "<w:p><w:r><w:t>Jane Doe</w:t></w:r></w:p>",
                "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r><w:t>{{SKILLS}}</w:t></w:r></w:p>"
            ),
            &[skills(&["Python", "Go", "Rust"])],
        );
        assert!(!xml.contains("{{SKILLS}}"));
        let part = XmlPart::parse("doc", &xml).expect("parse");
        let tree = DocumentTree::build(&part);
        let texts: Vec<String> = tree.paragraphs.iter().map(|p| tree.visible_text(p)).collect();
        assert_eq!(texts, vec!["Jane Doe", "Python", "Go", "Rust"]);
        assert!(!xml.contains("w:jc"));
    }

    #[test]
    fn placeholder_split_across_runs_is_found() {
        let xml = bound_xml(
            "<w:p><w:r><w:t>{{SKI</w:t></w:r><w:r><w:t>LLS}}</w:t></w:r></w:p>",
            &[skills(&["Rust"])],
        );
        assert_eq!(extract_visible_text(&xml).expect("text"), "Rust");
    }

    #[test]
    fn missing_placeholder_is_skipped() {
        let body = "<w:p><w:r><w:t>{{SKILLS}}</w:t></w:r></w:p>";
        let xml = bound_xml(
            body,
            &[TitledSection {
                title: "Awards".to_string(),
                content: vec!["Best paper".to_string()],
            }],
        );
        assert_eq!(xml, document_xml(body));
    }

    #[test]
    fn empty_section_leaves_table_cell_a_paragraph() {
        let xml = bound_xml(
            concat!(
                "<w:tbl><w:tr><w:tc><w:p><w:pPr><w:jc w:val=\"left\"/></w:pPr>",
                "<w:r><w:t>{{AWARDS}}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
                "<w:p><w:r><w:t>{{AWARDS}}</w:t></w:r></w:p>"
            ),
            &[TitledSection {
                title: "Awards".to_string(),
                content: vec!["  ".to_string()],
            }],
        );
        assert!(!xml.contains("{{AWARDS}}"));
        assert!(!xml.contains("<w:tc></w:tc>"));
        assert!(xml.contains("<w:tc><w:p><w:pPr><w:jc w:val=\"left\"/></w:pPr></w:p></w:tc>"));
        assert!(xml.contains("</w:tbl></w:body>"));
    }

    #[test]
    fn token_and_file_names() {
        assert_eq!(placeholder_token(" Work History "), "{{WORK HISTORY}}");
        assert_eq!(template_file_name("cv.docx"), "cv_template.docx");
    }

    #[test]
    fn catalog_reads_index_and_templates() {
        let dir = std::env::temp_dir().join(format!("rdp-templates-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(
            dir.join(TEMPLATE_INDEX_FILE),
            r#"[{"id":"modern","name":"Modern","description":"Two column","thumbnail":"/templates/modern.png"}]"#,
        )
        .expect("write index");
        std::fs::write(dir.join("modern.docx"), b"PK").expect("write template");

        let catalog = TemplateCatalog::load(&dir).expect("load");
        assert_eq!(catalog.get("modern").map(|t| t.name.as_str()), Some("Modern"));
        assert_eq!(catalog.read_template("modern").expect("read"), b"PK".to_vec());
        assert!(catalog.read_template("../etc/passwd").is_err());
        assert!(catalog.read_template("missing").is_err());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
