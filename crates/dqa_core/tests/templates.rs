use std::fs;

use pretty_assertions::assert_eq;
use tempfile::tempdir;

use dqa_core::templates::{discover_documents, read_template};

#[test]
fn discovers_only_allowed_extensions_in_sorted_order() {
    let tmp = tempdir().unwrap();
    for name in ["z.md", "a.pdf", "m.docx", "k.txt", "slides.pptx", "README"] {
        fs::write(tmp.path().join(name), "x").unwrap();
    }
    fs::create_dir(tmp.path().join("sub")).unwrap();
    fs::write(tmp.path().join("sub").join("deep.pdf"), "x").unwrap();

    let found: Vec<String> = discover_documents(tmp.path())
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(found, vec!["a.pdf", "k.txt", "m.docx", "z.md"]);
}

#[test]
fn missing_documents_dir_yields_empty_list() {
    let tmp = tempdir().unwrap();
    assert!(discover_documents(&tmp.path().join("nope")).is_empty());
}

#[test]
fn template_read_failure_degrades_to_empty_string() {
    let tmp = tempdir().unwrap();
    let path = tmp.path().join("instructions.tmpl");
    assert_eq!(read_template(&path), "");

    fs::write(&path, "Answer using only the attached policies.\n").unwrap();
    assert_eq!(read_template(&path), "Answer using only the attached policies.\n");
}
