use std::time::Duration;

use dqa_core::config::{IndexLifecycle, IngestionPolicy, OrchestratorConfig, DEFAULT_MODEL};
use dqa_core::error::ErrorKind;

#[test]
fn defaults_match_the_documented_behaviour() {
    let cfg = OrchestratorConfig::new("sk-test");
    assert_eq!(cfg.model, DEFAULT_MODEL);
    assert!(cfg.streaming);
    assert_eq!(cfg.poll_interval, Duration::from_millis(1000));
    assert_eq!(cfg.run_timeout, None);
    assert_eq!(cfg.ingestion_policy, IngestionPolicy::Warn);
    assert_eq!(cfg.index_lifecycle, IndexLifecycle::DeleteOnReplace);
    assert!(cfg.validate().is_ok());
}

#[test]
fn validation_errors_are_configuration_errors() {
    let err = OrchestratorConfig::new("").validate().expect_err("missing key");
    assert_eq!(err.code, "CONFIG_API_KEY_MISSING");
    assert_eq!(err.kind, Some(ErrorKind::Configuration));

    let mut cfg = OrchestratorConfig::new("sk-test");
    cfg.base_url = "api.openai.com".to_string();
    assert_eq!(cfg.validate().expect_err("bad url").code, "CONFIG_BASE_URL_INVALID");

    let mut cfg = OrchestratorConfig::new("sk-test");
    cfg.model = " ".to_string();
    assert_eq!(cfg.validate().expect_err("no model").code, "CONFIG_MODEL_MISSING");

    let mut cfg = OrchestratorConfig::new("sk-test");
    cfg.poll_interval = Duration::ZERO;
    assert_eq!(
        cfg.validate().expect_err("zero poll").code,
        "CONFIG_POLL_INTERVAL_INVALID"
    );
}

#[test]
fn base_url_trailing_slash_is_trimmed() {
    let mut cfg = OrchestratorConfig::new("sk-test");
    cfg.base_url = "http://127.0.0.1:8080/v1/".to_string();
    assert_eq!(cfg.normalized_base_url(), "http://127.0.0.1:8080/v1");
}

#[test]
fn policies_parse_from_snake_case() {
    let p: IngestionPolicy = serde_json::from_str("\"fail\"").unwrap();
    assert_eq!(p, IngestionPolicy::Fail);
    let l: IndexLifecycle = serde_json::from_str("\"delete_on_replace\"").unwrap();
    assert_eq!(l, IndexLifecycle::DeleteOnReplace);
}
