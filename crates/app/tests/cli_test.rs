//! Integration tests for the `stencil` CLI flow.
//!
//! Each test writes a dashboard and a data source fixture into a temporary
//! directory, runs the load pipeline and checks the resolved state.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::Path;

use clap::Parser;
use pretty_assertions::assert_eq;
use stencil::{Cli, run};
use stencil_domain::{Dashboard, LoadingState, VariableValue};
use tempfile::{TempDir, tempdir};

const DASHBOARD: &str = r#"{
  "uid": "hosts",
  "title": "Hosts",
  "time": {"from": "now-1h", "to": "now"},
  "panels": [{"id": 1, "title": "CPU"}],
  "templating": {
    "list": [
      {"type": "query", "name": "region", "query": "regions", "datasource": {"uid": "prom"}, "refresh": 1},
      {"type": "query", "name": "host", "query": "hosts.$region", "datasource": {"uid": "prom"}, "refresh": 1},
      {"type": "custom", "name": "env", "query": "prod,staging", "current": {"text": "staging", "value": "staging"}}
    ]
  }
}"#;

fn datasources(errors: &str) -> String {
    format!(
        r#"[{{
          "uid": "prom",
          "name": "Prometheus",
          "type": "prometheus",
          "isDefault": true,
          "queries": {{
            "regions": ["us", "eu"],
            "hosts.us": ["us-1", "us-2"],
            "hosts.eu": [{{"text": "Europe 1", "value": "eu-1"}}]
          }},
          "errors": {errors}
        }}]"#
    )
}

fn workspace(errors: &str) -> TempDir {
    let dir = tempdir().expect("Failed to create temp directory");
    std::fs::create_dir(dir.path().join("dashboards")).unwrap();
    std::fs::write(dir.path().join("dashboards/hosts.json"), DASHBOARD).unwrap();
    std::fs::write(dir.path().join("datasources.json"), datasources(errors)).unwrap();
    dir
}

fn cli(dir: &Path, extra: &[&str]) -> Cli {
    let dashboards = dir.join("dashboards");
    let datasources = dir.join("datasources.json");
    let settings = dir.join("settings.json");
    let mut args = vec![
        "stencil".to_string(),
        "hosts".to_string(),
        "--dashboards".to_string(),
        dashboards.display().to_string(),
        "--datasources".to_string(),
        datasources.display().to_string(),
        "--settings".to_string(),
        settings.display().to_string(),
    ];
    args.extend(extra.iter().map(ToString::to_string));
    Cli::parse_from(args)
}

#[tokio::test]
async fn test_load_resolves_dependency_chain() {
    let dir = workspace("{}");
    let report = run(cli(dir.path(), &["-i", "$region/$host", "-i", "${env}"]))
        .await
        .unwrap();

    assert_eq!(report.uid, "hosts");
    let names: Vec<&str> = report.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["region", "host", "env"]);
    assert!(report.variables.iter().all(|v| v.state == LoadingState::Done));
    assert_eq!(report.interpolations[0].result, "us/us-1");
    assert_eq!(report.interpolations[1].result, "staging");
    assert_eq!(report.url_query, "");
    assert!(report.notifications.is_empty());
}

#[tokio::test]
async fn test_url_query_takes_precedence() {
    let dir = workspace("{}");
    let report = run(cli(dir.path(), &["--query", "var-region=eu", "-i", "$host"]))
        .await
        .unwrap();

    let host = report.variables.iter().find(|v| v.name == "host").unwrap();
    assert_eq!(host.value, VariableValue::from("eu-1"));
    assert_eq!(host.text, "Europe 1");
    assert_eq!(report.interpolations[0].result, "eu-1");
    assert_eq!(report.url_query, "var-region=eu");
}

#[tokio::test]
async fn test_selection_cascades_and_syncs_url() {
    let dir = workspace("{}");
    let report = run(cli(dir.path(), &["--set", "region=eu"])).await.unwrap();

    let host = report.variables.iter().find(|v| v.name == "host").unwrap();
    assert_eq!(host.value, VariableValue::from("eu-1"));
    assert!(report.url_query.contains("var-region=eu"));
    assert!(report.url_query.contains("var-host=eu-1"));
    assert!(report.url_query.contains("var-env=staging"));
}

#[tokio::test]
async fn test_failed_query_is_reported_not_fatal() {
    let dir = workspace(r#"{"regions": "backend down"}"#);
    let report = run(cli(dir.path(), &[])).await.unwrap();

    let region = report.variables.iter().find(|v| v.name == "region").unwrap();
    assert_eq!(region.state, LoadingState::Error);
    assert!(region.error.as_ref().unwrap().message.ends_with("backend down"));
    assert_eq!(report.notifications.len(), 1);
    assert!(report.notifications[0].starts_with("Template variable service failed: "));
    assert!(report.to_text().contains("backend down)"));
}

#[tokio::test]
async fn test_save_current_as_default() {
    let dir = workspace("{}");
    let report = run(cli(
        dir.path(),
        &["--set", "env=prod", "--save", "--save-current-as-default"],
    ))
    .await
    .unwrap();
    assert!(report.saved);

    let content = std::fs::read_to_string(dir.path().join("dashboards/hosts.json")).unwrap();
    let saved: Dashboard = serde_json::from_str(&content).unwrap();
    let env = saved.variable("env").unwrap();
    assert_eq!(env.current.value, VariableValue::from("prod"));
    assert_eq!(saved.extra["panels"][0]["title"], "CPU");
}

#[tokio::test]
async fn test_unknown_selection_fails() {
    let dir = workspace("{}");
    let err = run(cli(dir.path(), &["--set", "missing=1"])).await.unwrap_err();
    assert!(err.to_string().contains("unknown variable: missing"));
}

#[tokio::test]
async fn test_missing_dashboard_fails() {
    let dir = workspace("{}");
    let mut args = cli(dir.path(), &[]);
    args.uid = "nope".to_string();
    let err = run(args).await.unwrap_err();
    assert!(err.to_string().contains("nope"));
}

#[tokio::test]
async fn test_json_report() {
    let dir = workspace("{}");
    let report = run(cli(dir.path(), &[])).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.render(true).unwrap()).unwrap();

    assert_eq!(json["uid"], "hosts");
    assert_eq!(json["variables"][0]["type"], "query");
    assert_eq!(json["variables"][2]["value"], "staging");
}
