//! Adapter between saved searches and the external job search.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::clients::jobseek::JobseekCli;
use crate::config::SearchConfig;
use crate::models::posting::Posting;
use crate::models::search::{SavedSearch, SearchParams};

/// Why a search produced no usable result. Always retried next cycle.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to start search program {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Search exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("Malformed search output: {0}")]
    Malformed(String),

    #[error("Search timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ExecutionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Runs one job search. An empty result is a normal outcome, not an error.
#[async_trait]
pub trait SearchExecutor: Send + Sync {
    async fn execute(&self, params: &SearchParams) -> Result<Vec<Posting>, ExecutionError>;
}

/// [`SearchExecutor`] backed by the `jobseek-expat` CLI.
pub struct CliSearchExecutor {
    cli: JobseekCli,
}

impl CliSearchExecutor {
    #[must_use]
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            cli: JobseekCli::new(&config.command, config.sites.clone()),
        }
    }
}

#[async_trait]
impl SearchExecutor for CliSearchExecutor {
    async fn execute(&self, params: &SearchParams) -> Result<Vec<Posting>, ExecutionError> {
        let records = self.cli.run(params).await?;
        Ok(normalize_records(records))
    }
}

/// Builds CLI parameters for a saved search, filling gaps from config.
#[must_use]
pub fn params_for(search: &SavedSearch, defaults: &SearchConfig) -> SearchParams {
    let country = if search.country.trim().is_empty() {
        defaults.default_country.clone()
    } else {
        search.country.clone()
    };

    SearchParams {
        keyword: search.keyword.clone(),
        country,
        location: non_empty(search.location.as_deref()),
        local_language: non_empty(search.language.as_deref()),
        hours_old: Some(
            search
                .hours_old
                .map_or(defaults.default_hours_old, clamp_non_negative),
        ),
        exclude: non_empty(search.exclude.as_deref()),
        results_wanted: search
            .results_wanted
            .map_or(defaults.default_results_wanted, clamp_non_negative),
    }
}

/// Converts raw records into postings, dropping any without a URL.
#[must_use]
pub fn normalize_records(records: Vec<Value>) -> Vec<Posting> {
    let total = records.len();
    let postings: Vec<Posting> = records.into_iter().filter_map(Posting::from_record).collect();

    if postings.len() < total {
        debug!(
            "Dropped {} search records without a URL",
            total - postings.len()
        );
    }

    postings
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn clamp_non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
