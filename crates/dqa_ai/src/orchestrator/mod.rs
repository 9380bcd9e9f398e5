use std::fs;
use std::path::{Path, PathBuf};

use dqa_core::citations::format_message;
use dqa_core::config::{IndexLifecycle, IngestionPolicy, OrchestratorConfig};
use dqa_core::domain::{
    AssistantProfile, ConversationThread, DocumentIndex, FileUpload, FormattedResult,
    MessageAttachment, NewMessage, RunStatus,
};
use dqa_core::error::{AppError, ErrorKind};
use dqa_core::templates::{discover_documents, read_template};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::service::AssistantService;

pub const DEFAULT_ASSISTANT_NAME: &str = "Research Assistant";

/// Inputs for [`DocumentQaOrchestrator::run_with_templates`]. Relative paths resolve against `base_dir`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateRun {
    pub base_dir: PathBuf,
    pub instructions_path: PathBuf,
    pub question_path: PathBuf,
    pub documents_dir: PathBuf,
    pub assistant_name: String,
    /// Asked instead of the contents of `question_path` when set.
    #[serde(default)]
    pub question_override: Option<String>,
}

impl Default for TemplateRun {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            instructions_path: PathBuf::from("instructions.tmpl"),
            question_path: PathBuf::from("question_with_policy.txt"),
            documents_dir: PathBuf::from("documents"),
            assistant_name: "Sustainability Research Assistant".to_string(),
            question_override: None,
        }
    }
}

impl TemplateRun {
    fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }
}

/// Answers questions grounded in uploaded documents by sequencing calls against an [`AssistantService`].
///
/// Holds at most one assistant (created once, reused) and the most recent vector store.
pub struct DocumentQaOrchestrator<S: AssistantService> {
    service: S,
    config: OrchestratorConfig,
    assistant: Option<AssistantProfile>,
    vector_store: Option<DocumentIndex>,
}

impl<S: AssistantService> DocumentQaOrchestrator<S> {
    pub fn new(service: S, config: OrchestratorConfig) -> Self {
        Self {
            service,
            config,
            assistant: None,
            vector_store: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn assistant(&self) -> Option<&AssistantProfile> {
        self.assistant.as_ref()
    }

    pub fn vector_store(&self) -> Option<&DocumentIndex> {
        self.vector_store.as_ref()
    }

    pub fn create_assistant(&self, name: &str, instructions: &str) -> Result<AssistantProfile, AppError> {
        self.service
            .create_assistant(name, instructions, &self.config.model)
            .map_err(|e| e.in_stage(ErrorKind::Configuration))
    }

    pub fn update_assistant(&self, assistant_id: &str, index_id: &str) -> Result<AssistantProfile, AppError> {
        self.service
            .update_assistant_vector_stores(assistant_id, &[index_id.to_string()])
            .map_err(|e| e.in_stage(ErrorKind::Configuration))
    }

    /// Create a vector store from `file_paths` and block until the vendor has processed every file.
    ///
    /// A store whose ingestion fails is deleted again under [`IndexLifecycle::DeleteOnReplace`].
    pub fn create_index(&self, name: &str, file_paths: &[PathBuf]) -> Result<DocumentIndex, AppError> {
        let index = self
            .service
            .create_vector_store(name)
            .map_err(|e| e.in_stage(ErrorKind::Ingestion))?;
        let id = index.id.clone();
        self.fill_index(index, file_paths).map_err(|e| {
            self.retire_index(&id, "ingestion failed");
            e.in_stage(ErrorKind::Ingestion)
        })
    }

    fn fill_index(&self, mut index: DocumentIndex, file_paths: &[PathBuf]) -> Result<DocumentIndex, AppError> {
        let mut file_ids: Vec<String> = Vec::with_capacity(file_paths.len());
        for path in file_paths {
            let upload = read_upload(path)?;
            let file = self.service.upload_file(upload)?;
            file_ids.push(file.id);
        }

        if file_ids.is_empty() {
            warn!(index_id = %index.id, "no documents to ingest");
            return Ok(index);
        }

        let batch = self.service.create_file_batch_and_poll(&index.id, &file_ids)?;
        info!(
            index_id = %index.id,
            status = batch.status.as_str(),
            completed = batch.file_counts.completed,
            failed = batch.file_counts.failed,
            cancelled = batch.file_counts.cancelled,
            in_progress = batch.file_counts.in_progress,
            total = batch.file_counts.total,
            "document ingestion finished"
        );
        index.status = batch.status;
        index.file_counts = batch.file_counts;

        self.apply_ingestion_policy(&index)?;
        Ok(index)
    }

    fn apply_ingestion_policy(&self, index: &DocumentIndex) -> Result<(), AppError> {
        if !index.has_failures() {
            return Ok(());
        }
        let details = format!(
            "index_id={}; status={}; failed={}; cancelled={}; total={}",
            index.id,
            index.status.as_str(),
            index.file_counts.failed,
            index.file_counts.cancelled,
            index.file_counts.total
        );
        match self.config.ingestion_policy {
            IngestionPolicy::Ignore => Ok(()),
            IngestionPolicy::Warn => {
                warn!(%details, "some documents failed to ingest; continuing");
                Ok(())
            }
            IngestionPolicy::Fail => Err(AppError::new(
                "INGEST_PARTIAL_FAILURE",
                "Some documents failed to ingest",
            )
            .with_details(details)),
        }
    }

    /// Open a thread seeded with `question`, optionally attaching one ad-hoc file for document search.
    pub fn create_thread(&self, question: &str, file_path: Option<&Path>) -> Result<ConversationThread, AppError> {
        let attachment = match file_path {
            Some(path) => {
                let upload = read_upload(path).map_err(|e| e.in_stage(ErrorKind::Ingestion))?;
                let file = self
                    .service
                    .upload_file(upload)
                    .map_err(|e| e.in_stage(ErrorKind::Ingestion))?;
                Some(MessageAttachment { file_id: file.id })
            }
            None => None,
        };
        self.service
            .create_thread(&NewMessage {
                content: question.to_string(),
                attachment,
            })
            .map_err(|e| e.in_stage(ErrorKind::Inference))
    }

    /// Execute a run on the thread and format the newest answer.
    pub fn get_response(&self, thread_id: &str, assistant_id: &str, streaming: bool) -> Result<FormattedResult, AppError> {
        let run = if streaming {
            self.service.stream_run(thread_id, assistant_id)
        } else {
            self.service.create_run_and_poll(thread_id, assistant_id)
        }
        .map_err(|e| e.in_stage(ErrorKind::Inference))?;

        if run.status != RunStatus::Completed {
            let details = match run.last_error.as_deref() {
                Some(last) => format!("run_id={}; last_error={last}", run.id),
                None => format!("run_id={}", run.id),
            };
            return Err(AppError::new(
                "INFERENCE_RUN_FAILED",
                format!("Run ended with status {}", run.status.as_str()),
            )
            .with_kind(ErrorKind::Inference)
            .with_details(details));
        }
        info!(run_id = %run.id, "run completed");

        // Streamed runs read the thread's newest message; polled runs filter by run id.
        let run_filter = if streaming { None } else { Some(run.id.as_str()) };
        let messages = self
            .service
            .list_messages(thread_id, run_filter)
            .map_err(|e| e.in_stage(ErrorKind::Inference))?;
        let message = messages.first().ok_or_else(|| {
            AppError::new("INFERENCE_NO_ANSWER", "Run completed but produced no answer")
                .with_kind(ErrorKind::Inference)
                .with_details(format!("thread_id={thread_id}; run_id={}", run.id))
        })?;

        format_message(message, |file_id| {
            self.service.retrieve_file(file_id).map(|f| f.filename)
        })
        .map_err(|e| e.in_stage(ErrorKind::Formatting))
    }

    /// Full sequence with a typed error: assistant, index, binding, thread, run, formatting.
    pub fn try_run(
        &mut self,
        question: &str,
        file_paths: &[PathBuf],
        assistant_name: &str,
        instructions: &str,
    ) -> Result<FormattedResult, AppError> {
        let assistant = match self.assistant.take() {
            Some(a) => a,
            None => self.create_assistant(assistant_name, instructions)?,
        };
        // Keep the cached profile even if a later step fails.
        self.assistant = Some(assistant.clone());

        let index = self.create_index(&format!("{assistant_name}_store"), file_paths)?;
        // The previous store stays cached and bound until the new one is bound in its place.
        let assistant = match self.update_assistant(&assistant.id, &index.id) {
            Ok(a) => a,
            Err(e) => {
                self.retire_index(&index.id, "assistant binding failed");
                return Err(e);
            }
        };
        self.assistant = Some(assistant.clone());
        if let Some(prev) = self.vector_store.replace(index) {
            self.retire_index(&prev.id, "replaced");
        }

        let thread = self.create_thread(question, None)?;
        self.get_response(&thread.id, &assistant.id, self.config.streaming)
    }

    /// Best-effort delete of a store that is no longer bound to the assistant.
    fn retire_index(&self, index_id: &str, reason: &str) {
        if self.config.index_lifecycle != IndexLifecycle::DeleteOnReplace {
            return;
        }
        match self.service.delete_vector_store(index_id) {
            Ok(()) => info!(index_id, reason, "deleted vector store"),
            Err(e) => warn!(index_id, reason, error = %e, "failed to delete vector store"),
        }
    }

    /// Like [`Self::try_run`], but every failure becomes `{response: "Error: <message>", citations: []}`.
    pub fn run(
        &mut self,
        question: &str,
        file_paths: &[PathBuf],
        assistant_name: &str,
        instructions: &str,
    ) -> FormattedResult {
        self.try_run(question, file_paths, assistant_name, instructions)
            .unwrap_or_else(|e| error_result(&e))
    }

    /// Discover documents and load both templates, then [`Self::try_run`].
    pub fn try_run_with_templates(&mut self, req: &TemplateRun) -> Result<FormattedResult, AppError> {
        let file_paths = discover_documents(&req.resolve(&req.documents_dir));
        let instructions = read_template(&req.resolve(&req.instructions_path));
        let question = match req.question_override.as_deref() {
            Some(q) => q.to_string(),
            None => read_template(&req.resolve(&req.question_path)),
        };
        info!(documents = file_paths.len(), "starting run");
        self.try_run(&question, &file_paths, &req.assistant_name, &instructions)
    }

    pub fn run_with_templates(&mut self, req: &TemplateRun) -> FormattedResult {
        self.try_run_with_templates(req)
            .unwrap_or_else(|e| error_result(&e))
    }
}

/// Log a failed run and collapse it into the user-visible error shape.
pub fn error_result(e: &AppError) -> FormattedResult {
    let kind = e
        .kind
        .map(|k| k.to_string())
        .unwrap_or_else(|| "unclassified".to_string());
    error!(
        kind = %kind,
        code = %e.code,
        details = e.details.as_deref().unwrap_or(""),
        "run failed: {}",
        e.message
    );
    FormattedResult::from_error(&e.message)
}

/// Read a document for upload. The handle is closed before this returns, on every path.
fn read_upload(path: &Path) -> Result<FileUpload, AppError> {
    let contents = fs::read(path).map_err(|e| {
        AppError::new("INGEST_FILE_UNREADABLE", "Failed to read document for upload")
            .with_kind(ErrorKind::Ingestion)
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    Ok(FileUpload { filename, contents })
}
