use dqa_core::domain::{
    AnswerMessage, AssistantProfile, ConversationThread, DocumentIndex, FileBatch, FileUpload,
    NewMessage, RemoteFile, Run,
};
use dqa_core::error::AppError;
use reqwest::blocking::multipart::{Form, Part};
use serde_json::json;

use super::AssistantService;
use crate::openai::poll::{poll_file_batch, poll_run};
use crate::openai::sse::read_run_events;
use crate::openai::wire::{
    self, AssistantObject, FileBatchObject, FileObject, ListObject, MessageObject, RunObject,
    ThreadObject, VectorStoreObject,
};
use crate::openai::OpenAiClient;

const FILE_PURPOSE: &str = "assistants";

impl AssistantService for OpenAiClient {
    fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        model: &str,
    ) -> Result<AssistantProfile, AppError> {
        let a: AssistantObject = self.post_json(
            "create_assistant",
            "assistants",
            wire::assistant_request(name, instructions, model),
        )?;
        Ok(a.into())
    }

    fn update_assistant_vector_stores(
        &self,
        assistant_id: &str,
        vector_store_ids: &[String],
    ) -> Result<AssistantProfile, AppError> {
        let a: AssistantObject = self.post_json(
            "update_assistant",
            &format!("assistants/{assistant_id}"),
            wire::assistant_vector_stores_request(vector_store_ids),
        )?;
        Ok(a.into())
    }

    fn create_vector_store(&self, name: &str) -> Result<DocumentIndex, AppError> {
        let v: VectorStoreObject =
            self.post_json("create_vector_store", "vector_stores", json!({ "name": name }))?;
        Ok(v.into())
    }

    fn delete_vector_store(&self, vector_store_id: &str) -> Result<(), AppError> {
        self.delete(
            "delete_vector_store",
            &format!("vector_stores/{vector_store_id}"),
        )
    }

    fn upload_file(&self, upload: FileUpload) -> Result<RemoteFile, AppError> {
        let part = Part::bytes(upload.contents).file_name(upload.filename);
        let form = Form::new().text("purpose", FILE_PURPOSE).part("file", part);
        let f: FileObject = self.post_multipart("upload_file", "files", form)?;
        Ok(f.into())
    }

    fn create_file_batch_and_poll(
        &self,
        vector_store_id: &str,
        file_ids: &[String],
    ) -> Result<FileBatch, AppError> {
        let batch: FileBatch = self
            .post_json::<FileBatchObject>(
                "create_file_batch",
                &format!("vector_stores/{vector_store_id}/file_batches"),
                json!({ "file_ids": file_ids }),
            )?
            .into();

        poll_file_batch(batch, self.poll_interval(), |b| {
            self.get_json::<FileBatchObject>(
                "poll_file_batch",
                &format!("vector_stores/{vector_store_id}/file_batches/{}", b.id),
                &[],
            )
            .map(FileBatch::from)
        })
    }

    fn create_thread(&self, message: &NewMessage) -> Result<ConversationThread, AppError> {
        let t: ThreadObject =
            self.post_json("create_thread", "threads", wire::thread_request(message))?;
        Ok(t.into())
    }

    fn stream_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AppError> {
        let deadline = self.deadline();
        let reader = self.post_event_stream(
            "stream_run",
            &format!("threads/{thread_id}/runs"),
            wire::run_request(assistant_id, true),
        )?;
        read_run_events(reader, deadline)
    }

    fn create_run_and_poll(&self, thread_id: &str, assistant_id: &str) -> Result<Run, AppError> {
        let deadline = self.deadline();
        let run: Run = self
            .post_json::<RunObject>(
                "create_run",
                &format!("threads/{thread_id}/runs"),
                wire::run_request(assistant_id, false),
            )?
            .into();

        poll_run(run, self.poll_interval(), deadline, |r| {
            self.get_json::<RunObject>(
                "poll_run",
                &format!("threads/{thread_id}/runs/{}", r.id),
                &[],
            )
            .map(Run::from)
        })
    }

    fn list_messages(
        &self,
        thread_id: &str,
        run_id: Option<&str>,
    ) -> Result<Vec<AnswerMessage>, AppError> {
        let mut query: Vec<(&str, &str)> = vec![("order", "desc")];
        if let Some(id) = run_id {
            query.push(("run_id", id));
        }
        let list: ListObject<MessageObject> = self.get_json(
            "list_messages",
            &format!("threads/{thread_id}/messages"),
            &query,
        )?;
        Ok(list.data.into_iter().map(AnswerMessage::from).collect())
    }

    fn retrieve_file(&self, file_id: &str) -> Result<RemoteFile, AppError> {
        let f: FileObject = self.get_json("retrieve_file", &format!("files/{file_id}"), &[])?;
        Ok(f.into())
    }
}
