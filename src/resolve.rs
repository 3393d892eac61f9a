//! Locates a visible-text passage inside `word/document.xml` and rewrites it.
//!
//! Strategies run in a fixed order against the current XML; the first one that produces a
//! new document wins. A request that no strategy matches leaves the XML untouched.

use std::ops::Range;

use tracing::{debug, warn};

use crate::config::{PatcherConfig, ResolverConfig};
use crate::docx::model::DocumentTree;
use crate::docx::synth::ParagraphSynth;
use crate::docx::xml::XmlPart;
use crate::ir::{ReplacementRequest, Resolution, Strategy};
use crate::sections::SectionIndex;
use crate::textutil::is_blank;

mod exact;
mod paragraph;
mod section;

pub struct Resolver {
    cfg: ResolverConfig,
    synth: ParagraphSynth,
}

/// Everything a strategy may look at for one request.
struct Attempt<'a> {
    resolver: &'a Resolver,
    xml: &'a str,
    part: &'a XmlPart,
    tree: &'a DocumentTree<'a>,
    target: &'a str,
    replacement: &'a str,
    section: &'a str,
    index: &'a SectionIndex,
    flattened: &'a str,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::from_config(&PatcherConfig::default())
    }
}

impl Resolver {
    pub fn new(cfg: ResolverConfig, synth: ParagraphSynth) -> Self {
        Self { cfg, synth }
    }

    pub fn from_config(cfg: &PatcherConfig) -> Self {
        Self::new(cfg.resolver.clone(), ParagraphSynth::new(cfg.synth.font()))
    }

    pub fn resolve(
        &self,
        xml: &str,
        request: &ReplacementRequest,
        index: &SectionIndex,
        flattened: &str,
    ) -> Resolution {
        let miss = || Resolution {
            strategy: None,
            xml: xml.to_string(),
        };
        if is_blank(&request.target) {
            debug!("skipping request with blank target");
            return miss();
        }

        let part = match XmlPart::parse("document", xml) {
            Ok(part) => part,
            Err(err) => {
                warn!(error = %format!("{err:#}"), "current document does not parse; no strategy can apply");
                return miss();
            }
        };
        let tree = DocumentTree::build(&part);
        let attempt = Attempt {
            resolver: self,
            xml,
            part: &part,
            tree: &tree,
            target: &request.target,
            replacement: &request.replacement,
            section: &request.section,
            index,
            flattened,
        };

        let applied = cascade(&self.cfg.strategies, |strategy| match strategy {
            Strategy::ExactRun => exact::exact_run(&attempt),
            Strategy::CrossRun => paragraph::cross_run(&attempt),
            Strategy::SectionFuzzy => section::section_fuzzy(&attempt),
            Strategy::SectionLength => section::section_length(&attempt),
        });
        match applied {
            Some((strategy, new_xml)) => {
                debug!(strategy = strategy.name(), target = %request.target, "replacement applied");
                Resolution {
                    strategy: Some(strategy),
                    xml: new_xml,
                }
            }
            None => miss(),
        }
    }
}

/// Run `strategies` in order and return the first rewrite. A strategy that errors is
/// logged and treated like one that did not match.
fn cascade<F>(strategies: &[Strategy], mut attempt: F) -> Option<(Strategy, String)>
where
    F: FnMut(Strategy) -> anyhow::Result<Option<String>>,
{
    for &strategy in strategies {
        match attempt(strategy) {
            Ok(Some(new_xml)) => return Some((strategy, new_xml)),
            Ok(None) => debug!(strategy = strategy.name(), "no match"),
            Err(err) => {
                warn!(strategy = strategy.name(), error = %format!("{err:#}"), "strategy failed; trying next")
            }
        }
    }
    None
}

/// Resolve one replacement with the default configuration.
pub fn resolve(
    xml: &str,
    target: &str,
    replacement: &str,
    section: &str,
    index: &SectionIndex,
    flattened: &str,
) -> Resolution {
    let request = ReplacementRequest::new(target, replacement, section);
    Resolver::default().resolve(xml, &request, index, flattened)
}

/// Apply a request to plain text, replacing every literal occurrence of the target.
/// Returns `None` when the target is blank or absent.
pub fn apply_to_text(text: &str, request: &ReplacementRequest) -> Option<String> {
    if is_blank(&request.target) || !text.contains(&request.target) {
        return None;
    }
    Some(text.replace(&request.target, &request.replacement))
}

fn splice(xml: &str, range: Range<usize>, with: &str) -> String {
    let mut out = String::with_capacity(xml.len() + with.len());
    out.push_str(&xml[..range.start]);
    out.push_str(with);
    out.push_str(&xml[range.end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::model::extract_visible_text;
    use crate::docx::package::testing::document_xml;
    use crate::docx::extract::extract_text;
    use crate::sections::SectionIndexer;

    fn run(xml: &str, request: &ReplacementRequest) -> Resolution {
        let text = extract_text(xml).expect("text");
        let index = SectionIndexer::default().index(&text);
        Resolver::default().resolve(xml, request, &index, &text)
    }

    #[test]
    fn blank_target_is_a_byte_identical_miss() {
        let xml = document_xml("<w:p><w:r><w:t>Increased sales by 10%</w:t></w:r></w:p>");
        for target in ["", "   ", "\t\n"] {
            let res = run(&xml, &ReplacementRequest::new(target, "x", "experience"));
            assert!(!res.applied());
            assert_eq!(res.xml, xml);
        }
    }

    #[test]
    fn single_run_edit_touches_only_the_substring() {
        let xml = document_xml(concat!(
            "<w:p w:rsidR=\"001\"><w:pPr><w:pStyle w:val=\"ListBullet\"/></w:pPr>",
            "<w:r><w:rPr><w:i /></w:rPr><w:t>Increased sales by 10%</w:t></w:r></w:p>"
        ));
        let res = run(
            &xml,
            &ReplacementRequest::new("Increased sales by 10%", "Increased revenue by 15%", ""),
        );
        assert_eq!(res.strategy, Some(Strategy::ExactRun));
        assert_eq!(
            res.xml,
            xml.replace("Increased sales by 10%", "Increased revenue by 15%")
        );
    }

    #[test]
    fn exact_run_replaces_first_occurrence_only() {
        let xml = document_xml(concat!(
            "<w:p><w:r><w:t>Java and Java</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Java</w:t></w:r></w:p>"
        ));
        let res = run(&xml, &ReplacementRequest::new("Java", "Rust", ""));
        assert_eq!(res.strategy, Some(Strategy::ExactRun));
        assert_eq!(
            res.xml,
            document_xml(concat!(
                "<w:p><w:r><w:t>Rust and Java</w:t></w:r></w:p>",
                "<w:p><w:r><w:t>Java</w:t></w:r></w:p>"
            ))
        );
    }

    #[test]
    fn exact_run_escapes_markup_in_text() {
        let xml = document_xml("<w:p><w:r><w:t>R&amp;D lead</w:t></w:r></w:p>");
        let res = run(&xml, &ReplacementRequest::new("R&D", "Research & <Dev>", ""));
        assert_eq!(res.strategy, Some(Strategy::ExactRun));
        assert!(res.xml.contains("<w:t>Research &amp; &lt;Dev&gt; lead</w:t>"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let xml = document_xml("<w:p><w:r><w:t>Skills: C++ (.NET) [*]</w:t></w:r></w:p>");
        let res = run(&xml, &ReplacementRequest::new("C++ (.NET) [*]", "Rust", ""));
        assert_eq!(res.strategy, Some(Strategy::ExactRun));
        assert!(res.xml.contains("<w:t>Skills: Rust</w:t>"));

        let res = run(&xml, &ReplacementRequest::new("C+ (.NET)", "Rust", ""));
        assert!(!res.applied());
    }

    #[test]
    fn entity_lookalike_target_does_not_split_entities() {
        let xml = document_xml("<w:p><w:r><w:t>Q&amp;A amp; more</w:t></w:r></w:p>");
        let res = run(&xml, &ReplacementRequest::new("amp;", "x", ""));
        assert_eq!(res.strategy, Some(Strategy::ExactRun));
        let text = extract_visible_text(&res.xml).expect("text");
        assert_eq!(text, "Q&A x more");
    }

    #[test]
    fn leading_space_gets_preserve_flag() {
        let xml = document_xml("<w:p><w:r><w:t>Lead</w:t></w:r></w:p>");
        let res = run(&xml, &ReplacementRequest::new("Lead", " Staff lead", ""));
        assert_eq!(res.strategy, Some(Strategy::ExactRun));
        assert!(res.xml.contains(r#"<w:t xml:space="preserve"> Staff lead</w:t>"#));
    }

    #[test]
    fn cross_run_rebuilds_one_paragraph() {
        let xml = document_xml(concat!(
            "<w:p><w:pPr><w:jc w:val=\"left\"/></w:pPr>",
            "<w:r><w:t xml:space=\"preserve\">Led a team </w:t></w:r>",
            "<w:r><w:rPr><w:b/></w:rPr><w:t>of five engineers</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Other</w:t></w:r></w:p>"
        ));
        let res = run(
            &xml,
            &ReplacementRequest::new("Led a team of five engineers", "Led a team of eight engineers", ""),
        );
        assert_eq!(res.strategy, Some(Strategy::CrossRun));
        assert!(res.xml.contains(concat!(
            "<w:p><w:pPr><w:jc w:val=\"left\"/></w:pPr><w:r><w:rPr>",
            "<w:rFonts w:ascii=\"Calibri\" w:hAnsi=\"Calibri\"/><w:sz w:val=\"22\"/></w:rPr>",
            "<w:t>Led a team of eight engineers</w:t></w:r></w:p>"
        )));
        assert!(res.xml.contains("<w:p><w:r><w:t>Other</w:t></w:r></w:p>"));
        assert!(!res.xml.contains("<w:b/>"));
    }

    #[test]
    fn cross_run_keeps_words_apart_at_tabs() {
        let xml = document_xml(concat!(
            "<w:p><w:r><w:t xml:space=\"preserve\">Senior </w:t></w:r>",
            "<w:r><w:rPr><w:b/></w:rPr><w:t>Engineer</w:t><w:tab/><w:t>2019 - 2023</w:t></w:r></w:p>"
        ));
        let res = run(&xml, &ReplacementRequest::new("Senior Engineer", "Staff Engineer", ""));
        assert_eq!(res.strategy, Some(Strategy::CrossRun));
        assert_eq!(
            extract_visible_text(&res.xml).expect("text"),
            "Staff Engineer 2019 - 2023"
        );

        let res = run(
            &xml,
            &ReplacementRequest::new("Senior Engineer 2019 - 2023", "Staff Engineer 2019 - 2024", ""),
        );
        assert_eq!(res.strategy, Some(Strategy::CrossRun));
        assert_eq!(
            extract_visible_text(&res.xml).expect("text"),
            "Staff Engineer 2019 - 2024"
        );
    }

    #[test]
    fn section_line_with_tab_is_located() {
        let xml = document_xml(concat!(
            "<w:p><w:r><w:t>EXPERIENCE</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Platform Engineer</w:t><w:tab/><w:t>2019 - 2023</w:t></w:r></w:p>"
        ));
        let res = run(
            &xml,
            &ReplacementRequest::new("Platform Engineer, 2019 - 2023", "Staff Engineer 2019 - 2023", "experience"),
        );
        assert_eq!(res.strategy, Some(Strategy::SectionFuzzy));
        assert!(res.xml.contains("<w:t>Staff Engineer 2019 - 2023</w:t>"));
        assert!(!res.xml.contains("Platform"));
    }

    #[test]
    fn section_fuzzy_tolerates_paraphrase() {
        let xml = document_xml(concat!(
            "<w:p><w:r><w:t>EXPERIENCE</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Managed cross-functional teams</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>EDUCATION</w:t></w:r></w:p>"
        ));
        let res = run(
            &xml,
            &ReplacementRequest::new(
                "Managed cross functional team",
                "Directed cross-functional teams of 12",
                "experience",
            ),
        );
        assert_eq!(res.strategy, Some(Strategy::SectionFuzzy));
        assert!(res.xml.contains("<w:t>Directed cross-functional teams of 12</w:t>"));
        assert!(!res.xml.contains("Managed"));
    }

    #[test]
    fn section_fuzzy_needs_a_matching_section() {
        let xml = document_xml(concat!(
            "<w:p><w:r><w:t>EXPERIENCE</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Managed cross-functional teams</w:t></w:r></w:p>"
        ));
        let res = run(
            &xml,
            &ReplacementRequest::new("Managed cross functional team", "x", "awards"),
        );
        assert!(!res.applied());
        assert_eq!(res.xml, xml);
    }

    #[test]
    fn section_length_is_the_last_resort() {
        let xml = document_xml(concat!(
            "<w:p><w:r><w:t>SKILLS</w:t></w:r></w:p>",
            "<w:p><w:r><w:t>Kubernetes, Terraform, AWS</w:t></w:r></w:p>"
        ));
        let res = run(
            &xml,
            &ReplacementRequest::new("Docker, Ansible and Azure", "Kubernetes, Terraform, GCP", "Skills"),
        );
        assert_eq!(res.strategy, Some(Strategy::SectionLength));
        assert!(res.xml.contains("<w:t>Kubernetes, Terraform, GCP</w:t>"));
        assert!(res.xml.contains("<w:t>SKILLS</w:t>"));
    }

    #[test]
    fn disabled_strategies_are_skipped() {
        let xml = document_xml("<w:p><w:r><w:t>Increased sales</w:t></w:r></w:p>");
        let mut cfg = PatcherConfig::default();
        cfg.resolver.strategies = vec![Strategy::CrossRun];
        let resolver = Resolver::from_config(&cfg);
        let text = extract_text(&xml).expect("text");
        let res = resolver.resolve(
            &xml,
            &ReplacementRequest::new("sales", "revenue", ""),
            &SectionIndex::default(),
            &text,
        );
        assert_eq!(res.strategy, Some(Strategy::CrossRun));
    }

    #[test]
    fn failing_strategy_falls_through_to_the_next() {
        let mut tried: Vec<Strategy> = Vec::new();
        let applied = cascade(&Strategy::CASCADE, |strategy| {
            tried.push(strategy);
            match strategy {
                Strategy::ExactRun => Err(anyhow::anyhow!("in-run replacement changed document structure")),
                Strategy::CrossRun => Ok(None),
                Strategy::SectionFuzzy => Ok(Some("<w:p/>".to_string())),
                Strategy::SectionLength => unreachable!("cascade stops at the first rewrite"),
            }
        });
        assert_eq!(applied, Some((Strategy::SectionFuzzy, "<w:p/>".to_string())));
        assert_eq!(
            tried,
            vec![Strategy::ExactRun, Strategy::CrossRun, Strategy::SectionFuzzy]
        );

        let none = cascade(&Strategy::CASCADE, |_| Err(anyhow::anyhow!("broken")));
        assert_eq!(none, None);
    }

    #[test]
    fn unparsable_document_is_a_miss() {
        let xml = "<w:p><w:r><w:t>x</w:t></w:p>";
        let res = resolve(xml, "x", "y", "", &SectionIndex::default(), "x");
        assert!(!res.applied());
        assert_eq!(res.xml, xml);
    }

    #[test]
    fn text_preview_replaces_all_occurrences() {
        let req = ReplacementRequest::new("Java", "Rust", "skills");
        assert_eq!(
            apply_to_text("Java, Java 8", &req).as_deref(),
            Some("Rust, Rust 8")
        );
        assert!(apply_to_text("Go", &req).is_none());
        assert!(apply_to_text("Go", &ReplacementRequest::new(" ", "x", "")).is_none());
    }
}
