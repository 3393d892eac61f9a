use std::io::{Cursor, Read, Write};

use resume_docx_patcher::docx::extract::extract_text;
use resume_docx_patcher::{
    apply_all, bind, PatchError, ReplacementRequest, SectionIndexer, Strategy,
};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#;

fn docx(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut zw = ZipWriter::new(Cursor::new(Vec::new()));
    let opts = SimpleFileOptions::default();
    for (name, data) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("word/document.xml", document.as_str()),
        ("word/styles.xml", "<w:styles/>"),
    ] {
        zw.start_file(name, opts).expect("start entry");
        zw.write_all(data.as_bytes()).expect("write entry");
    }
    zw.finish().expect("finish zip").into_inner()
}

fn read_entry(container: &[u8], name: &str) -> String {
    let mut zip = ZipArchive::new(Cursor::new(container)).expect("open zip");
    let mut file = zip.by_name(name).expect("entry");
    let mut out = String::new();
    file.read_to_string(&mut out).expect("read entry");
    out
}

fn para(text: &str) -> String {
    format!("<w:p><w:r><w:t>{text}</w:t></w:r></w:p>")
}

fn resume_body() -> String {
    [
        para("Jane Doe"),
        para("EXPERIENCE"),
        para("Managed cross-functional teams"),
        r#"<w:p><w:pPr><w:pStyle w:val="ListBullet"/></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Shipped </w:t></w:r><w:r><w:t>three products</w:t></w:r></w:p>"#.to_string(),
        para("SKILLS"),
        para("Java, SQL"),
    ]
    .concat()
}

#[test]
fn single_run_edit_leaves_other_bytes_alone() {
    let input = docx(&resume_body());
    let before = read_entry(&input, "word/document.xml");
    let outcome = apply_all(
        &input,
        &[ReplacementRequest::new("Java", "Rust", "skills")],
    )
    .expect("patch");

    assert_eq!(outcome.applied, vec![true]);
    assert_eq!(outcome.strategies, vec![Some(Strategy::ExactRun)]);
    let after = read_entry(&outcome.container, "word/document.xml");
    assert_eq!(after, before.replacen("<w:t>Java, SQL</w:t>", "<w:t>Rust, SQL</w:t>", 1));
    assert_eq!(read_entry(&outcome.container, "word/styles.xml"), "<w:styles/>");
}

#[test]
fn text_split_across_runs_is_rebuilt_with_style() {
    let input = docx(&resume_body());
    let outcome = apply_all(
        &input,
        &[ReplacementRequest::new(
            "Shipped three products",
            "Shipped five products",
            "experience",
        )],
    )
    .expect("patch");

    assert_eq!(outcome.strategies, vec![Some(Strategy::CrossRun)]);
    let after = read_entry(&outcome.container, "word/document.xml");
    assert!(after.contains(
        r#"<w:p><w:pPr><w:pStyle w:val="ListBullet"/></w:pPr><w:r>"#
    ));
    let text = extract_text(&after).expect("text");
    assert!(text.contains("Shipped five products"));
    assert!(!text.contains("three"));
}

#[test]
fn near_miss_in_section_is_rewritten() {
    let input = docx(&resume_body());
    let outcome = apply_all(
        &input,
        &[ReplacementRequest::new(
            "Managed cross functional team",
            "Led a 12-person cross-functional team",
            "Experience",
        )],
    )
    .expect("patch");

    assert_eq!(outcome.strategies, vec![Some(Strategy::SectionFuzzy)]);
    let text = extract_text(&read_entry(&outcome.container, "word/document.xml")).expect("text");
    assert!(text.contains("Led a 12-person cross-functional team"));
    assert!(!text.contains("Managed cross-functional teams"));
    assert!(outcome.sections.find("experience").is_some());
}

#[test]
fn misses_leave_document_identical() {
    let input = docx(&resume_body());
    let before = read_entry(&input, "word/document.xml");
    let requests = vec![
        ReplacementRequest::new("", "anything", "skills"),
        ReplacementRequest::new("Completely unrelated sentence that is nowhere", "x", "hobbies"),
    ];
    let first = apply_all(&input, &requests).expect("first");
    let second = apply_all(&input, &requests).expect("second");

    assert_eq!(first.applied, vec![false, false]);
    assert_eq!(first.summary(), "Applied 0 of 2 suggestions");
    assert_eq!(read_entry(&first.container, "word/document.xml"), before);
    assert_eq!(
        read_entry(&second.container, "word/document.xml"),
        read_entry(&first.container, "word/document.xml")
    );
}

#[test]
fn later_requests_see_earlier_edits() {
    let input = docx(&resume_body());
    let chain = vec![
        ReplacementRequest::new("Java", "Go", "skills"),
        ReplacementRequest::new("Go, SQL", "Go, SQL, Kafka", "skills"),
    ];
    let forward = apply_all(&input, &chain).expect("forward");
    assert_eq!(forward.applied, vec![true, true]);

    let reversed: Vec<_> = chain.iter().rev().cloned().collect();
    let backward = apply_all(&input, &reversed).expect("backward");
    assert_eq!(backward.applied, vec![false, true]);
    assert_ne!(
        read_entry(&forward.container, "word/document.xml"),
        read_entry(&backward.container, "word/document.xml")
    );
}

#[test]
fn not_a_docx_is_a_structural_error() {
    let err = apply_all(b"%PDF-1.7", &[ReplacementRequest::new("a", "b", "c")]).unwrap_err();
    assert!(matches!(err, PatchError::Container(_)));
}

#[test]
fn resume_text_fills_template_placeholders() {
    let text = "Jane Doe\nBackend engineer\nEXPERIENCE\nAcme Corp\nSKILLS\nRust\nSQL";
    let sections = SectionIndexer::default().detect_titled_sections(text);
    let titles: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["SUMMARY", "EXPERIENCE", "SKILLS"]);

    let template = docx(&[para("{{SUMMARY}}"), para("{{EXPERIENCE}}"), para("{{SKILLS}}")].concat());
    let bound = bind(&template, &sections).expect("bind");
    let out = extract_text(&read_entry(&bound, "word/document.xml")).expect("text");
    assert_eq!(
        out,
        "Jane Doe\nBackend engineer\nAcme Corp\nRust\nSQL"
    );
}
