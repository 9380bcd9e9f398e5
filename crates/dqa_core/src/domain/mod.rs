use serde::{Deserialize, Serialize};

/// Remote assistant configuration. The document-search capability is always enabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistantProfile {
    pub id: String,
    pub name: String,
    pub instructions: String,
    pub model: String,
    /// Vector stores bound to the document-search capability (at most one in practice).
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStatus {
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl IngestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionStatus::InProgress => "in_progress",
            IngestionStatus::Completed => "completed",
            IngestionStatus::Cancelled => "cancelled",
            IngestionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileCounts {
    pub in_progress: u32,
    pub completed: u32,
    pub failed: u32,
    pub cancelled: u32,
    pub total: u32,
}

/// A vendor-managed vector store built from uploaded documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentIndex {
    pub id: String,
    pub name: String,
    pub status: IngestionStatus,
    pub file_counts: FileCounts,
}

impl DocumentIndex {
    /// True when at least one file (or the batch as a whole) did not ingest.
    pub fn has_failures(&self) -> bool {
        self.file_counts.failed > 0
            || self.file_counts.cancelled > 0
            || matches!(
                self.status,
                IngestionStatus::Failed | IngestionStatus::Cancelled
            )
    }
}

/// Result of polling a file batch until the vendor stops processing it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileBatch {
    pub id: String,
    pub vector_store_id: String,
    pub status: IngestionStatus,
    pub file_counts: FileCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: String,
    pub filename: String,
    pub bytes: u64,
}

/// File contents read from disk, ready to be sent to the vendor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub filename: String,
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageAttachment {
    pub file_id: String,
}

/// The single user message a thread is seeded with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewMessage {
    pub content: String,
    pub attachment: Option<MessageAttachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationThread {
    pub id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// A status this client does not know; treated as terminal and unsuccessful.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnnotationKind {
    FileCitation { file_id: String },
    FilePath { file_id: String },
    Other,
}

/// Marker inside generated text pointing at the span derived from a source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Annotation {
    pub text: String,
    pub start_index: Option<u32>,
    pub end_index: Option<u32>,
    pub kind: AnnotationKind,
}

impl Annotation {
    pub fn cited_file_id(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::FileCitation { file_id } => Some(file_id.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextContent {
    pub value: String,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text(TextContent),
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerMessage {
    pub id: String,
    pub role: String,
    pub run_id: Option<String>,
    pub content: Vec<MessageContent>,
}

impl AnswerMessage {
    pub fn first_text(&self) -> Option<&TextContent> {
        self.content.iter().find_map(|c| match c {
            MessageContent::Text(t) => Some(t),
            MessageContent::Other => None,
        })
    }
}

/// Final answer with inline `[i]` markers and the matching `[i] filename` citation lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormattedResult {
    pub response: String,
    pub citations: Vec<String>,
}

impl FormattedResult {
    pub fn from_error(message: &str) -> Self {
        Self {
            response: format!("Error: {message}"),
            citations: Vec::new(),
        }
    }
}
