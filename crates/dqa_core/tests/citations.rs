use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use dqa_core::citations::format_message;
use dqa_core::domain::{
    Annotation, AnnotationKind, AnswerMessage, FormattedResult, MessageContent, TextContent,
};
use dqa_core::error::AppError;

fn message(value: &str, annotations: Vec<Annotation>) -> AnswerMessage {
    AnswerMessage {
        id: "msg_1".to_string(),
        role: "assistant".to_string(),
        run_id: Some("run_1".to_string()),
        content: vec![MessageContent::Text(TextContent {
            value: value.to_string(),
            annotations,
        })],
    }
}

fn annotation(text: &str, kind: AnnotationKind) -> Annotation {
    Annotation {
        text: text.to_string(),
        start_index: None,
        end_index: None,
        kind,
    }
}

fn citation(text: &str, file_id: &str) -> Annotation {
    annotation(
        text,
        AnnotationKind::FileCitation {
            file_id: file_id.to_string(),
        },
    )
}

fn resolver(files: &[(&str, &str)]) -> impl FnMut(&str) -> Result<String, AppError> {
    let map: BTreeMap<String, String> = files
        .iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect();
    move |id: &str| {
        map.get(id)
            .cloned()
            .ok_or_else(|| AppError::new("VENDOR_HTTP_ERROR", "No such file"))
    }
}

#[test]
fn no_annotations_leaves_text_unchanged() {
    let msg = message("The target is net zero by 2040.", vec![]);
    let out = format_message(&msg, resolver(&[])).expect("format");
    assert_eq!(
        out,
        FormattedResult {
            response: "The target is net zero by 2040.".to_string(),
            citations: vec![],
        }
    );
}

#[test]
fn each_file_citation_gets_its_index() {
    let msg = message(
        "Target 2040【4:0†plan.pdf】, interim 2030【4:1†policy.md】, audited【4:2†audit.docx】.",
        vec![
            citation("【4:0†plan.pdf】", "file-1"),
            citation("【4:1†policy.md】", "file-2"),
            citation("【4:2†audit.docx】", "file-3"),
        ],
    );
    let out = format_message(
        &msg,
        resolver(&[
            ("file-1", "plan.pdf"),
            ("file-2", "policy.md"),
            ("file-3", "audit.docx"),
        ]),
    )
    .expect("format");
    assert_eq!(out.response, "Target 2040[0], interim 2030[1], audited[2].");
    assert_eq!(
        out.citations,
        vec!["[0] plan.pdf", "[1] policy.md", "[2] audit.docx"]
    );
}

#[test]
fn non_citation_annotations_leave_gaps_in_the_citation_list() {
    let msg = message(
        "Download〔a〕 then read【b】.",
        vec![
            annotation(
                "〔a〕",
                AnnotationKind::FilePath {
                    file_id: "file-out".to_string(),
                },
            ),
            citation("【b】", "file-b"),
            annotation("missing-span", AnnotationKind::Other),
        ],
    );
    let out = format_message(&msg, resolver(&[("file-b", "b.txt")])).expect("format");
    assert_eq!(out.response, "Download[0] then read[1].");
    assert_eq!(out.citations, vec!["[1] b.txt"]);
}

#[test]
fn repeated_source_text_replaces_earliest_occurrence_first() {
    // The same marker text appears twice; successive annotations consume occurrences left to right.
    let msg = message(
        "A【1】 B【1】",
        vec![citation("【1】", "file-a"), citation("【1】", "file-a")],
    );
    let out = format_message(&msg, resolver(&[("file-a", "a.pdf")])).expect("format");
    assert_eq!(out.response, "A[0] B[1]");
    assert_eq!(out.citations, vec!["[0] a.pdf", "[1] a.pdf"]);
}
