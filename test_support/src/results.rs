//! Helpers for comparing run results.

use tsukemono::result::{RunResult, RunResults};

fn zero_timestamps(result: &mut RunResult) {
    result.timestamp = 0;
    result.children.iter_mut().for_each(zero_timestamps);
}

/// `results` with every timestamp zeroed, so two runs compare equal.
#[must_use]
pub fn normalised(mut results: RunResults) -> RunResults {
    results.stats.run_start = 0;
    results.stats.run_end = 0;
    results.results.iter_mut().for_each(zero_timestamps);
    results
}

/// Description and status of every test, depth first.
#[must_use]
pub fn test_statuses(results: &RunResults) -> Vec<(String, String)> {
    results
        .tests()
        .into_iter()
        .map(|test| {
            let status = test
                .status
                .and_then(|status| serde_json::to_value(status).ok())
                .and_then(|value| value.as_str().map(str::to_owned))
                .unwrap_or_default();
            (test.description.clone(), status)
        })
        .collect()
}
