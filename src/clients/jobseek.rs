use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::constants::defaults;
use crate::models::search::SearchParams;
use crate::services::search::ExecutionError;

/// Runs the `jobseek-expat` command line scraper and returns its raw JSON records.
#[derive(Debug, Clone)]
pub struct JobseekCli {
    program: PathBuf,
    leading_args: Vec<String>,
    sites: Vec<String>,
}

impl JobseekCli {
    /// `command` is the program followed by any fixed leading arguments.
    #[must_use]
    pub fn new(command: &[String], sites: Vec<String>) -> Self {
        let (program, leading_args) = match command.split_first() {
            Some((program, rest)) => (resolve_program(program), rest.to_vec()),
            None => (PathBuf::from(defaults::SEARCH_PROGRAM), Vec::new()),
        };

        Self {
            program,
            leading_args,
            sites,
        }
    }

    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    #[must_use]
    pub fn build_args(&self, params: &SearchParams) -> Vec<String> {
        let results_wanted = if params.results_wanted == 0 {
            defaults::RESULTS_WANTED_FALLBACK
        } else {
            params.results_wanted
        };

        let country = if params.country.trim().is_empty() {
            defaults::COUNTRY
        } else {
            params.country.as_str()
        };

        let mut args = vec![
            params.keyword.clone(),
            "--country".to_string(),
            country.to_string(),
            "--output".to_string(),
            "json".to_string(),
            "--results-wanted".to_string(),
            results_wanted.to_string(),
        ];

        for site in &self.sites {
            args.push("--site".to_string());
            args.push(site.clone());
        }

        if let Some(location) = &params.location {
            args.push("--location".to_string());
            args.push(location.clone());
        }
        if let Some(language) = &params.local_language {
            args.push("--local-language".to_string());
            args.push(language.clone());
        }
        if let Some(hours) = params.hours_old.filter(|h| *h > 0) {
            args.push("--hours-old".to_string());
            args.push(hours.to_string());
        }
        if let Some(exclude) = &params.exclude {
            args.push("--exclude".to_string());
            args.push(exclude.clone());
        }

        args
    }

    /// Runs one search. The child is killed if the returned future is dropped,
    /// so wrapping this in a timeout cancels the scrape as well.
    pub async fn run(&self, params: &SearchParams) -> Result<Vec<Value>, ExecutionError> {
        let args = self.build_args(params);
        debug!(
            program = %self.program.display(),
            "Running search: {:?} {:?}",
            self.leading_args,
            args
        );

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ExecutionError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExecutionError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice::<Vec<Value>>(&output.stdout)
            .map_err(|e| ExecutionError::Malformed(e.to_string()))
    }
}

fn resolve_program(program: &str) -> PathBuf {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.to_path_buf();
    }

    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let full = dir.join(program);
            if full.is_file() {
                return full;
            }
        }
    }

    if let Some(home) = dirs::home_dir() {
        let local = home.join(".local").join("bin").join(program);
        if local.is_file() {
            return local;
        }
    }

    PathBuf::from(program)
}
