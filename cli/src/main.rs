use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use dqa_ai::orchestrator::error_result;
use dqa_ai::{DocumentQaOrchestrator, OpenAiClient, TemplateRun};
use dqa_core::config::{
    IndexLifecycle, IngestionPolicy, OrchestratorConfig, API_KEY_ENV, BASE_URL_ENV,
    DEFAULT_BASE_URL, DEFAULT_MODEL, MODEL_ENV,
};
use dqa_core::domain::FormattedResult;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IngestionPolicyArg {
    Ignore,
    Warn,
    Fail,
}

impl From<IngestionPolicyArg> for IngestionPolicy {
    fn from(v: IngestionPolicyArg) -> Self {
        match v {
            IngestionPolicyArg::Ignore => IngestionPolicy::Ignore,
            IngestionPolicyArg::Warn => IngestionPolicy::Warn,
            IngestionPolicyArg::Fail => IngestionPolicy::Fail,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IndexLifecycleArg {
    Keep,
    DeleteOnReplace,
}

impl From<IndexLifecycleArg> for IndexLifecycle {
    fn from(v: IndexLifecycleArg) -> Self {
        match v {
            IndexLifecycleArg::Keep => IndexLifecycle::Keep,
            IndexLifecycleArg::DeleteOnReplace => IndexLifecycle::DeleteOnReplace,
        }
    }
}

/// Answer a question grounded in a directory of documents using a hosted assistant.
#[derive(Debug, Parser)]
#[command(name = "docqa", version, about)]
struct Cli {
    #[arg(long, env = API_KEY_ENV, hide_env_values = true, default_value = "")]
    api_key: String,

    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = MODEL_ENV, default_value = DEFAULT_MODEL)]
    model: String,

    /// Directory that relative template and document paths resolve against.
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    #[arg(long, default_value = "instructions.tmpl")]
    instructions: PathBuf,

    #[arg(long, default_value = "question_with_policy.txt")]
    question: PathBuf,

    #[arg(long, default_value = "documents")]
    documents: PathBuf,

    #[arg(long, default_value = "Sustainability Research Assistant")]
    assistant_name: String,

    /// Ask this question directly instead of reading the question template.
    #[arg(long)]
    ask: Option<String>,

    /// Poll run status instead of streaming run events.
    #[arg(long)]
    poll: bool,

    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Give up on a run after this many seconds (default: wait for the service).
    #[arg(long)]
    run_timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value = "warn")]
    ingestion_policy: IngestionPolicyArg,

    #[arg(long, value_enum, default_value = "delete-on-replace")]
    index_lifecycle: IndexLifecycleArg,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> OrchestratorConfig {
        let mut cfg = OrchestratorConfig::new(self.api_key.clone());
        cfg.base_url = self.base_url.clone();
        cfg.model = self.model.clone();
        cfg.streaming = !self.poll;
        cfg.poll_interval = Duration::from_millis(self.poll_interval_ms);
        cfg.run_timeout = self.run_timeout_secs.map(Duration::from_secs);
        cfg.ingestion_policy = self.ingestion_policy.into();
        cfg.index_lifecycle = self.index_lifecycle.into();
        cfg
    }

    fn template_run(&self) -> TemplateRun {
        TemplateRun {
            base_dir: self.base_dir.clone(),
            instructions_path: self.instructions.clone(),
            question_path: self.question.clone(),
            documents_dir: self.documents.clone(),
            assistant_name: self.assistant_name.clone(),
            question_override: self.ask.clone(),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn print_result(res: &FormattedResult, json: bool) {
    if json {
        match serde_json::to_string_pretty(res) {
            Ok(s) => println!("{s}"),
            Err(e) => eprintln!("failed to encode result: {e}"),
        }
        return;
    }
    println!("\nResponse: {}", res.response);
    println!("\nCitations:");
    for citation in &res.citations {
        println!("{citation}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = cli.config();
    let client = match OpenAiClient::new(&config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e.message);
            if let Some(details) = e.details.as_deref() {
                eprintln!("  {details}");
            }
            return ExitCode::from(2);
        }
    };
    let mut orchestrator = DocumentQaOrchestrator::new(client, config);

    let res = orchestrator.try_run_with_templates(&cli.template_run());

    match res {
        Ok(answer) => {
            print_result(&answer, cli.json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_result(&error_result(&e), cli.json);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_with_no_arguments() {
        let cli = Cli::try_parse_from(["docqa"]).expect("parse");
        let req = cli.template_run();
        assert_eq!(req, TemplateRun::default());

        let cfg = cli.config();
        assert!(cfg.streaming);
        assert_eq!(cfg.run_timeout, None);
        assert_eq!(cfg.ingestion_policy, IngestionPolicy::Warn);
        assert_eq!(cfg.index_lifecycle, IndexLifecycle::DeleteOnReplace);
    }

    #[test]
    fn ask_overrides_only_the_question() {
        let cli = Cli::try_parse_from(["docqa", "--base-dir", "/data", "--ask", "Is it net zero?"])
            .expect("parse");
        let req = cli.template_run();
        assert_eq!(req.question_override.as_deref(), Some("Is it net zero?"));
        assert_eq!(
            req,
            TemplateRun {
                base_dir: PathBuf::from("/data"),
                question_override: Some("Is it net zero?".to_string()),
                ..TemplateRun::default()
            }
        );
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "docqa",
            "--api-key",
            "sk-test",
            "--poll",
            "--poll-interval-ms",
            "250",
            "--run-timeout-secs",
            "90",
            "--ingestion-policy",
            "fail",
            "--index-lifecycle",
            "keep",
        ])
        .expect("parse");
        let cfg = cli.config();
        assert_eq!(cfg.api_key, "sk-test");
        assert!(!cfg.streaming);
        assert_eq!(cfg.poll_interval, Duration::from_millis(250));
        assert_eq!(cfg.run_timeout, Some(Duration::from_secs(90)));
        assert_eq!(cfg.ingestion_policy, IngestionPolicy::Fail);
        assert_eq!(cfg.index_lifecycle, IndexLifecycle::Keep);
    }
}
