//! End-to-end harness runs against the fixtures under `fixtures/`, each on an
//! ephemeral port.

use std::io::Write;
use std::path::PathBuf;

use replay_cli::report::Report;
use replay_cli::{exit_status, run_harness, HarnessConfig, HarnessError};
use replay_core::FixtureError;
use replay_runner::{ConfigError, FailureReason, Outcome, ReplayConfig};
use serde_json::json;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

fn config(contract: impl Into<PathBuf>, schema: impl Into<PathBuf>) -> HarnessConfig {
    HarnessConfig::new(contract, schema, ReplayConfig::local(0).unwrap())
}

fn temp_contract(interactions: serde_json::Value) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, "{}", json!({"interactions": interactions})).unwrap();
    file
}

#[tokio::test]
async fn consistent_contract_passes_end_to_end() {
    let summary = run_harness(&config(
        fixture("widgets.pact.json"),
        fixture("widgets.openapi.json"),
    ))
    .await
    .unwrap();

    assert_eq!(summary.total(), 5);
    assert!(summary.all_passed(), "{:#?}", summary.outcomes());
    assert_eq!(exit_status(&summary), 0);
    let statuses: Vec<Outcome> = summary.outcomes().iter().map(|o| o.outcome.clone()).collect();
    assert_eq!(
        statuses,
        vec![
            Outcome::Passed { status: 200 },
            Outcome::Passed { status: 200 },
            Outcome::Passed { status: 201 },
            Outcome::Passed { status: 404 },
            Outcome::Passed { status: 200 },
        ]
    );
    assert_eq!(summary.outcomes()[1].provider_state, "two widgets exist");
    assert_eq!(summary.outcomes()[4].provider_state, "service up");
}

#[tokio::test]
async fn single_get_interaction_against_yaml_schema() {
    let contract = temp_contract(json!([{
        "description": "get widget",
        "providerState": "widget exists",
        "request": {"method": "GET", "path": "/widgets/1"},
        "response": {"status": 200, "body": {"id": 1, "name": "bolt"}}
    }]));
    let summary = run_harness(&config(contract.path(), fixture("widgets.openapi.yaml")))
        .await
        .unwrap();

    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.outcomes()[0].outcome, Outcome::Passed { status: 200 });
}

#[tokio::test]
async fn stale_recorded_content_lengths_do_not_break_replay() {
    let contract = temp_contract(json!([
        {"description": "get widget", "providerState": "widget exists",
         "request": {"method": "GET", "path": "/widgets/1"},
         "response": {"status": 200,
                      "headers": {"Content-Type": "application/json", "Content-Length": "64"},
                      "body": {"id": 1, "name": "bolt"}}},
        {"description": "create nut", "providerState": "no widgets",
         "request": {"method": "POST", "path": "/widgets",
                     "headers": {"Content-Type": "application/json", "Content-Length": "40"},
                     "body": {"name": "nut"}},
         "response": {"status": 201, "body": {"id": 3, "name": "nut"}}}
    ]));
    let summary = run_harness(&config(contract.path(), fixture("widgets.openapi.json")))
        .await
        .unwrap();

    assert!(summary.all_passed(), "{:#?}", summary.outcomes());
    assert_eq!(summary.outcomes()[0].outcome, Outcome::Passed { status: 200 });
    assert_eq!(summary.outcomes()[1].outcome, Outcome::Passed { status: 201 });
}

#[tokio::test]
async fn inconsistent_contract_reports_each_failure() {
    let summary = run_harness(&config(
        fixture("widgets-failing.pact.json"),
        fixture("widgets.openapi.json"),
    ))
    .await
    .unwrap();

    assert_eq!(summary.passed(), 1);
    assert_eq!(summary.failed(), 4);
    assert_eq!(exit_status(&summary), 1);
    assert_eq!(
        summary.failing_descriptions(),
        vec![
            "health without status",
            "create widget with numeric name",
            "delete widget",
            "widget with wrong id type",
        ]
    );

    let outcomes = summary.outcomes();
    assert!(matches!(
        &outcomes[1].outcome,
        Outcome::Failed { reason: FailureReason::ServerRejected { status: 500, .. } }
    ));
    match &outcomes[2].outcome {
        Outcome::Failed {
            reason: FailureReason::ServerRejected { message, .. },
        } => assert!(message.starts_with("request validation failed"), "{message}"),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(matches!(
        &outcomes[3].outcome,
        Outcome::Failed { reason: FailureReason::NotRegistered { .. } }
    ));
    match &outcomes[4].outcome {
        Outcome::Failed {
            reason: FailureReason::ServerRejected { message, .. },
        } => assert!(message.starts_with("response validation failed"), "{message}"),
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn missing_provider_state_is_fatal_before_serving() {
    let err = run_harness(&config(
        fixture("missing-provider-state.pact.json"),
        fixture("widgets.openapi.json"),
    ))
    .await
    .unwrap_err();

    match err {
        HarnessError::Fixture(FixtureError::MissingProviderState { index, description }) => {
            assert_eq!(index, 1);
            assert_eq!(description, "orphan");
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn unreadable_schema_is_fatal() {
    let err = run_harness(&config(
        fixture("widgets.pact.json"),
        fixture("does-not-exist.openapi.json"),
    ))
    .await
    .unwrap_err();
    assert!(matches!(err, HarnessError::Schema(_)));
}

#[tokio::test]
async fn base_url_with_a_path_is_fatal() {
    let mut cfg = config(fixture("widgets.pact.json"), fixture("widgets.openapi.json"));
    cfg.replay.base_url = url::Url::parse("http://127.0.0.1/api/v1").unwrap();
    let err = run_harness(&cfg).await.unwrap_err();
    assert!(matches!(err, HarnessError::Config(ConfigError::BasePath(_))));
}

#[tokio::test]
async fn replay_is_idempotent_across_fresh_servers() {
    let cfg = config(
        fixture("widgets-failing.pact.json"),
        fixture("widgets.openapi.json"),
    );
    let first = run_harness(&cfg).await.unwrap();
    let second = run_harness(&cfg).await.unwrap();
    assert_eq!(first.classifications(), second.classifications());
    assert_eq!(first.classifications(), vec![true, false, false, false, false]);
}

#[tokio::test]
async fn later_duplicate_route_answers_every_replay() {
    let valid = json!({"description": "valid widget", "providerState": "a",
        "request": {"method": "GET", "path": "/widgets/5"},
        "response": {"status": 200, "body": {"id": 5, "name": "pin"}}});
    let invalid = json!({"description": "invalid widget", "providerState": "b",
        "request": {"method": "GET", "path": "/widgets/5"},
        "response": {"status": 200, "body": {"id": 5}}});

    let contract = temp_contract(json!([invalid.clone(), valid.clone()]));
    let summary = run_harness(&config(contract.path(), fixture("widgets.openapi.json")))
        .await
        .unwrap();
    assert!(summary.all_passed());

    let contract = temp_contract(json!([valid, invalid]));
    let summary = run_harness(&config(contract.path(), fixture("widgets.openapi.json")))
        .await
        .unwrap();
    assert_eq!(summary.failed(), 2);
}

#[tokio::test]
async fn report_captures_the_run() {
    let cfg = config(
        fixture("widgets-failing.pact.json"),
        fixture("widgets.openapi.json"),
    );
    let summary = run_harness(&cfg).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    Report::new(&cfg, &summary).write(&path).unwrap();

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(report["all_passed"], false);
    assert_eq!(report["summary"]["failed"], 4);
    assert_eq!(report["summary"]["outcomes"][3]["reason"]["kind"], "not_registered");
    assert_eq!(report["summary"]["outcomes"][0]["result"], "passed");
}
