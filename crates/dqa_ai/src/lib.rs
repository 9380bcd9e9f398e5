pub mod openai;
pub mod orchestrator;
pub mod service;

pub use openai::OpenAiClient;
pub use orchestrator::{DocumentQaOrchestrator, TemplateRun};
pub use service::AssistantService;
