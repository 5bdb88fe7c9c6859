//! CLI dispatch
//!
//! Builds a `Prober` from the parsed arguments, runs the requested probes
//! and prints either the rendered table or JSON to stdout.

use crate::cli::{Args, Error, Result, EXIT_DB_ERROR, EXIT_FAILURE, EXIT_SUCCESS};
use crate::config::ProbeConfig;
use crate::probe::{ProbeError, ProbeRequest, Prober, RunStatus, TestRun};
use crate::report::render_table;
use crate::store::{MemoryStore, ProbeStore, SqliteStore};
use std::sync::Arc;

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// Run the probes and return an exit code
///
/// Exit codes: 0 when every run passed or was partial, 1 when any run
/// failed or was blocked, any domain was rejected, or on argument/config
/// errors, 2 when the store cannot be opened.
pub fn run_cli(args: Args) -> ExitCode {
    match run_probes(&args) {
        Ok((runs, rejected)) => {
            for error in &rejected {
                eprintln!("Error: {}", error);
            }
            exit_code(&runs, &rejected)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            match e {
                Error::Database(_) => EXIT_DB_ERROR,
                _ => EXIT_FAILURE,
            }
        }
    }
}

fn exit_code(runs: &[TestRun], rejected: &[ProbeError]) -> ExitCode {
    let all_ok = runs
        .iter()
        .all(|r| matches!(r.status, RunStatus::Passed | RunStatus::Partial));
    if all_ok && rejected.is_empty() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

/// Split batch results into finished runs and rejected requests, keeping order
fn partition_results(
    results: Vec<std::result::Result<TestRun, ProbeError>>,
) -> (Vec<TestRun>, Vec<ProbeError>) {
    let mut runs = Vec::with_capacity(results.len());
    let mut rejected = Vec::new();
    for result in results {
        match result {
            Ok(run) => runs.push(run),
            Err(e) => rejected.push(e),
        }
    }
    (runs, rejected)
}

fn run_probes(args: &Args) -> Result<(Vec<TestRun>, Vec<ProbeError>)> {
    let config = match &args.config_file {
        Some(path) => ProbeConfig::load(path).map_err(|e| Error::Config(e.to_string()))?,
        None => ProbeConfig::default(),
    };

    let store: Arc<dyn ProbeStore> = match &args.db_file {
        Some(path) => {
            Arc::new(SqliteStore::open(path).map_err(|e| Error::Database(e.to_string()))?)
        }
        None => Arc::new(MemoryStore::new()),
    };

    let prober = Prober::new(config).with_store(store);
    let requests: Vec<ProbeRequest> = args
        .domains
        .iter()
        .map(|domain| {
            let request = ProbeRequest::new(domain.clone(), args.test_type);
            match &args.category {
                Some(category) => request.with_category(category.clone()),
                None => request,
            }
        })
        .collect();

    let (runs, rejected) = partition_results(prober.run_batch(&requests));

    if args.json_output {
        let json = if args.domains.len() == 1 && runs.len() == 1 {
            serde_json::to_string_pretty(&runs[0])?
        } else {
            serde_json::to_string_pretty(&runs)?
        };
        println!("{}", json);
    } else {
        for run in &runs {
            println!("{}", render_table(run));
        }
    }

    Ok((runs, rejected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::TestType;
    use crate::transport::FakeTransport;

    #[test]
    fn test_invalid_domain_keeps_other_runs() {
        let prober = Prober::new(ProbeConfig::for_tests()).with_transport(FakeTransport::new());
        let requests = vec![
            ProbeRequest::new("first.test", TestType::Browse),
            ProbeRequest::new("not a domain", TestType::Browse),
            ProbeRequest::new("second.test", TestType::Browse),
        ];

        let (runs, rejected) = partition_results(prober.run_batch(&requests));

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].domain, "first.test");
        assert_eq!(runs[1].domain, "second.test");
        assert_eq!(rejected.len(), 1);
        assert!(matches!(rejected[0], ProbeError::InvalidDomain(_)));
        assert_eq!(exit_code(&runs, &rejected), EXIT_FAILURE);
    }

    #[test]
    fn test_exit_code_without_rejections() {
        assert_eq!(exit_code(&[], &[]), EXIT_SUCCESS);
        assert_eq!(
            exit_code(&[], &[ProbeError::InvalidDomain("x".to_string())]),
            EXIT_FAILURE
        );
    }
}
