//! Runs the CLI search executor against a stand-in shell command.
#![cfg(unix)]

use jobseek::config::SearchConfig;
use jobseek::models::search::SearchParams;
use jobseek::services::{CliSearchExecutor, ExecutionError, SearchExecutor};

fn params() -> SearchParams {
    SearchParams {
        keyword: "rust".to_string(),
        country: "Germany".to_string(),
        location: None,
        local_language: None,
        hours_old: Some(24),
        exclude: None,
        results_wanted: 10,
    }
}

fn executor(script: &str) -> CliSearchExecutor {
    let config = SearchConfig {
        command: vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "jobseek-expat".to_string(),
        ],
        ..SearchConfig::default()
    };
    CliSearchExecutor::new(&config)
}

#[tokio::test]
async fn test_parses_json_output() {
    let executor = executor(
        r#"echo '[{"title":"Rust Dev","company":"Acme","job_url":"https://a","site":"linkedin"},{"title":"No link"}]'"#,
    );

    let postings = executor.execute(&params()).await.unwrap();

    assert_eq!(postings.len(), 1);
    assert_eq!(postings[0].url, "https://a");
    assert_eq!(postings[0].company, "Acme");
    assert_eq!(postings[0].extra["site"], "linkedin");
}

#[tokio::test]
async fn test_keyword_is_passed_as_first_argument() {
    let executor = executor(r#"printf '[{"title":"%s","job_url":"https://x"}]' "$1""#);

    let postings = executor.execute(&params()).await.unwrap();
    assert_eq!(postings[0].title, "rust");
}

#[tokio::test]
async fn test_nonzero_exit_is_an_error() {
    let executor = executor("echo 'rate limited' >&2; exit 3");

    let err = executor.execute(&params()).await.unwrap_err();
    match err {
        ExecutionError::Exit { stderr, .. } => assert_eq!(stderr, "rate limited"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_non_json_output_is_malformed() {
    let executor = executor("echo 'Traceback (most recent call last)'");

    let err = executor.execute(&params()).await.unwrap_err();
    assert!(matches!(err, ExecutionError::Malformed(_)));
}

#[tokio::test]
async fn test_missing_program_fails_to_spawn() {
    let config = SearchConfig {
        command: vec!["/nonexistent/jobseek-expat".to_string()],
        ..SearchConfig::default()
    };

    let err = CliSearchExecutor::new(&config)
        .execute(&params())
        .await
        .unwrap_err();
    assert!(matches!(err, ExecutionError::Spawn { .. }));
}
