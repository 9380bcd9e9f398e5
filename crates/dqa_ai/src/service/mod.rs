use dqa_core::domain::{
    AnswerMessage, AssistantProfile, ConversationThread, DocumentIndex, FileBatch, FileUpload,
    NewMessage, RemoteFile, Run,
};
use dqa_core::error::AppError;

/// Operations the orchestrator needs from a hosted assistant service.
///
/// Every call blocks until the vendor answers; `*_and_poll` and `stream_run` block until the
/// vendor reports a terminal state.
pub trait AssistantService {
    fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        model: &str,
    ) -> Result<AssistantProfile, AppError>;

    /// Bind the document-search capability to exactly `vector_store_ids`.
    fn update_assistant_vector_stores(
        &self,
        assistant_id: &str,
        vector_store_ids: &[String],
    ) -> Result<AssistantProfile, AppError>;

    fn create_vector_store(&self, name: &str) -> Result<DocumentIndex, AppError>;

    fn delete_vector_store(&self, vector_store_id: &str) -> Result<(), AppError>;

    fn upload_file(&self, upload: FileUpload) -> Result<RemoteFile, AppError>;

    fn create_file_batch_and_poll(
        &self,
        vector_store_id: &str,
        file_ids: &[String],
    ) -> Result<FileBatch, AppError>;

    fn create_thread(&self, message: &NewMessage) -> Result<ConversationThread, AppError>;

    fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AppError>;

    fn create_run_and_poll(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AppError>;

    /// Messages newest first, optionally restricted to those produced by `run_id`.
    fn list_messages(
        &self,
        thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<AnswerMessage>, AppError>;

    fn retrieve_file(&self, file_id: &str) -> Result<RemoteFile, AppError>;
}

pub mod openai_service;
