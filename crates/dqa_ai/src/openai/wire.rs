//! Request and response shapes of the Assistants v2 API, and their mapping onto the domain model.

use dqa_core::domain::{
    Annotation, AnnotationKind, AnswerMessage, AssistantProfile, ConversationThread,
    DocumentIndex, FileBatch, FileCounts, IngestionStatus, MessageContent, NewMessage, RemoteFile,
    Run, RunStatus, TextContent,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: Option<String>,
}

/// Extract `error.message` from a vendor error body.
pub(crate) fn vendor_error_message(body: &str) -> Option<String> {
    let env: ApiErrorEnvelope = serde_json::from_str(body).ok()?;
    env.error.message.filter(|m| !m.trim().is_empty())
}

pub(crate) fn assistant_request(name: &str, instructions: &str, model: &str) -> serde_json::Value {
    json!({
        "name": name,
        "instructions": instructions,
        "model": model,
        "tools": [{ "type": "file_search" }],
    })
}

pub(crate) fn assistant_vector_stores_request(vector_store_ids: &[String]) -> serde_json::Value {
    json!({
        "tool_resources": {
            "file_search": { "vector_store_ids": vector_store_ids }
        }
    })
}

pub(crate) fn thread_request(message: &NewMessage) -> serde_json::Value {
    let mut msg = json!({
        "role": "user",
        "content": message.content,
    });
    if let Some(att) = message.attachment.as_ref() {
        msg["attachments"] = json!([{
            "file_id": att.file_id,
            "tools": [{ "type": "file_search" }],
        }]);
    }
    json!({ "messages": [msg] })
}

pub(crate) fn run_request(assistant_id: &str, stream: bool) -> serde_json::Value {
    if stream {
        json!({ "assistant_id": assistant_id, "stream": true })
    } else {
        json!({ "assistant_id": assistant_id })
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct FileSearchResources {
    #[serde(default)]
    vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ToolResources {
    file_search: Option<FileSearchResources>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AssistantObject {
    id: String,
    name: Option<String>,
    instructions: Option<String>,
    model: String,
    tool_resources: Option<ToolResources>,
}

impl From<AssistantObject> for AssistantProfile {
    fn from(a: AssistantObject) -> Self {
        let vector_store_ids = a
            .tool_resources
            .and_then(|t| t.file_search)
            .map(|f| f.vector_store_ids)
            .unwrap_or_default();
        AssistantProfile {
            id: a.id,
            name: a.name.unwrap_or_default(),
            instructions: a.instructions.unwrap_or_default(),
            model: a.model,
            vector_store_ids,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
pub(crate) struct FileCountsObject {
    #[serde(default)]
    in_progress: u32,
    #[serde(default)]
    completed: u32,
    #[serde(default)]
    failed: u32,
    #[serde(default)]
    cancelled: u32,
    #[serde(default)]
    total: u32,
}

impl From<FileCountsObject> for FileCounts {
    fn from(c: FileCountsObject) -> Self {
        FileCounts {
            in_progress: c.in_progress,
            completed: c.completed,
            failed: c.failed,
            cancelled: c.cancelled,
            total: c.total,
        }
    }
}

/// Vector stores report `expired`; batches report `cancelled`/`failed`. Anything unknown is a failure.
pub(crate) fn ingestion_status(s: &str) -> IngestionStatus {
    match s {
        "in_progress" => IngestionStatus::InProgress,
        "completed" => IngestionStatus::Completed,
        "cancelled" => IngestionStatus::Cancelled,
        _ => IngestionStatus::Failed,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VectorStoreObject {
    id: String,
    name: Option<String>,
    status: String,
    #[serde(default)]
    file_counts: FileCountsObject,
}

impl From<VectorStoreObject> for DocumentIndex {
    fn from(v: VectorStoreObject) -> Self {
        DocumentIndex {
            status: ingestion_status(&v.status),
            file_counts: v.file_counts.into(),
            id: v.id,
            name: v.name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FileBatchObject {
    id: String,
    vector_store_id: String,
    status: String,
    #[serde(default)]
    file_counts: FileCountsObject,
}

impl From<FileBatchObject> for FileBatch {
    fn from(b: FileBatchObject) -> Self {
        FileBatch {
            status: ingestion_status(&b.status),
            file_counts: b.file_counts.into(),
            id: b.id,
            vector_store_id: b.vector_store_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FileObject {
    id: String,
    filename: String,
    #[serde(default)]
    bytes: u64,
}

impl From<FileObject> for RemoteFile {
    fn from(f: FileObject) -> Self {
        RemoteFile {
            id: f.id,
            filename: f.filename,
            bytes: f.bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ThreadObject {
    id: String,
}

impl From<ThreadObject> for ConversationThread {
    fn from(t: ThreadObject) -> Self {
        ConversationThread { id: t.id }
    }
}

/// Statuses added by the vendor later decode as `Unknown`, which ends polling as a failed run.
pub(crate) fn run_status(s: &str) -> RunStatus {
    match s {
        "queued" => RunStatus::Queued,
        "in_progress" => RunStatus::InProgress,
        "requires_action" => RunStatus::RequiresAction,
        "cancelling" => RunStatus::Cancelling,
        "cancelled" => RunStatus::Cancelled,
        "failed" => RunStatus::Failed,
        "completed" => RunStatus::Completed,
        "incomplete" => RunStatus::Incomplete,
        "expired" => RunStatus::Expired,
        _ => RunStatus::Unknown,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunLastError {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RunObject {
    id: String,
    thread_id: String,
    status: String,
    last_error: Option<RunLastError>,
}

impl From<RunObject> for Run {
    fn from(r: RunObject) -> Self {
        let last_error = r.last_error.map(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) => "unknown error".to_string(),
        });
        Run {
            id: r.id,
            thread_id: r.thread_id,
            status: run_status(&r.status),
            last_error,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FileRef {
    file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AnnotationObject {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
    start_index: Option<u32>,
    end_index: Option<u32>,
    file_citation: Option<FileRef>,
    file_path: Option<FileRef>,
}

impl From<AnnotationObject> for Annotation {
    fn from(a: AnnotationObject) -> Self {
        let kind = match (a.kind.as_str(), a.file_citation, a.file_path) {
            ("file_citation", Some(f), _) => AnnotationKind::FileCitation { file_id: f.file_id },
            ("file_path", _, Some(f)) => AnnotationKind::FilePath { file_id: f.file_id },
            _ => AnnotationKind::Other,
        };
        Annotation {
            text: a.text,
            start_index: a.start_index,
            end_index: a.end_index,
            kind,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TextObject {
    value: String,
    #[serde(default)]
    annotations: Vec<AnnotationObject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentObject {
    Text { text: TextObject },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageObject {
    id: String,
    role: String,
    run_id: Option<String>,
    #[serde(default)]
    content: Vec<ContentObject>,
}

impl From<MessageObject> for AnswerMessage {
    fn from(m: MessageObject) -> Self {
        let content = m
            .content
            .into_iter()
            .map(|c| match c {
                ContentObject::Text { text } => MessageContent::Text(TextContent {
                    value: text.value,
                    annotations: text.annotations.into_iter().map(Annotation::from).collect(),
                }),
                ContentObject::Other => MessageContent::Other,
            })
            .collect();
        AnswerMessage {
            id: m.id,
            role: m.role,
            run_id: m.run_id,
            content,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ListObject<T> {
    pub data: Vec<T>,
}
