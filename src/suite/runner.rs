//! Sequential case runner
//!
//! Cases run one at a time in schedule order. Each probe case gets a fresh
//! [`MockTransport`]; upload cases go through the configured [`Uploader`]
//! and fail when object storage could not be set up.

use super::{Action, Case, ProbeCase, Suite, SuiteError, Tag};
use crate::metrics;
use crate::probe::mock::MockTransport;
use crate::probe::Prober;
use crate::s3::ObjectStore;
use crate::upload::Uploader;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Outcome of one case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum CaseOutcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl CaseOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CaseOutcome::Passed => "passed",
            CaseOutcome::Failed(_) => "failed",
            CaseOutcome::Skipped(_) => "skipped",
        }
    }
}

/// One line of the report
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub tags: Vec<Tag>,
    pub outcome: CaseOutcome,
    pub duration: Duration,
}

/// Results of a run, in execution order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    results: Vec<CaseResult>,
}

impl Report {
    pub fn results(&self) -> &[CaseResult] {
        &self.results
    }

    pub fn outcome(&self, name: &str) -> Option<&CaseOutcome> {
        self.results
            .iter()
            .find(|r| r.name == name)
            .map(|r| &r.outcome)
    }

    fn count(&self, label: &str) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count("passed")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }

    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    /// No case failed
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    /// e.g. "8 passed, 1 failed, 1 skipped"
    pub fn summary(&self) -> String {
        format!(
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            write!(f, "{:<8} {}", result.outcome.label().to_uppercase(), result.name)?;
            match &result.outcome {
                CaseOutcome::Passed => writeln!(f, " ({} ms)", result.duration.as_millis())?,
                CaseOutcome::Failed(reason) | CaseOutcome::Skipped(reason) => {
                    writeln!(f, ": {}", reason)?
                }
            }
        }
        write!(f, "{}", self.summary())
    }
}

/// Render an error with its source chain
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Runs cases of a suite
pub struct Runner<S> {
    /// The uploader, or why object storage could not be set up
    uploader: Result<Uploader<S>, String>,
}

impl<S: ObjectStore> Runner<S> {
    pub fn new(uploader: Uploader<S>) -> Self {
        Self {
            uploader: Ok(uploader),
        }
    }

    /// Upload cases fail with `reason`; probe cases run as usual
    pub fn without_storage(reason: impl Into<String>) -> Self {
        Self {
            uploader: Err(reason.into()),
        }
    }

    /// Run the cases matching `tags` (all cases when empty)
    pub async fn run(&self, suite: &Suite, tags: &[Tag]) -> Result<Report, SuiteError> {
        let scheduled = suite.schedule(tags)?;
        tracing::info!(cases = scheduled.len(), "Running suite");

        let mut report = Report::default();
        let mut passed: HashSet<String> = HashSet::new();

        for case in scheduled {
            let start_time = Instant::now();
            let span = tracing::info_span!("case", name = %case.name);

            let outcome = match case.depends_on.iter().find(|d| !passed.contains(*d)) {
                Some(dependency) => CaseOutcome::Skipped(format!(
                    "depends on '{}' which did not pass",
                    dependency
                )),
                None => self.run_case(case).instrument(span.clone()).await,
            };

            span.in_scope(|| match &outcome {
                CaseOutcome::Passed => tracing::info!("Case passed"),
                CaseOutcome::Failed(reason) => tracing::error!(reason = %reason, "Case failed"),
                CaseOutcome::Skipped(reason) => tracing::warn!(reason = %reason, "Case skipped"),
            });
            metrics::record_case(outcome.label());

            if outcome == CaseOutcome::Passed {
                passed.insert(case.name.clone());
            }

            report.results.push(CaseResult {
                name: case.name.clone(),
                tags: case.tags.clone(),
                outcome,
                duration: start_time.elapsed(),
            });
        }

        tracing::info!(summary = %report.summary(), "Suite finished");
        Ok(report)
    }

    async fn run_case(&self, case: &Case) -> CaseOutcome {
        match &case.action {
            Action::Upload { file } => match &self.uploader {
                Err(reason) => CaseOutcome::Failed(format!(
                    "object storage is not available: {}",
                    reason
                )),
                Ok(uploader) => match uploader.upload_and_verify(file).await {
                    Ok(_) => CaseOutcome::Passed,
                    Err(e) => CaseOutcome::Failed(error_chain(&e)),
                },
            },
            Action::Probe(probe) => match run_probe(probe).await {
                Ok(()) => CaseOutcome::Passed,
                Err(reason) => CaseOutcome::Failed(reason),
            },
        }
    }
}

async fn run_probe(case: &ProbeCase) -> Result<(), String> {
    let mock = MockTransport::new();
    case.mock.apply(&mock);

    let prober = Prober::new(&mock);
    let outcome = prober.probe(&case.url).await;
    case.expected.verify(&outcome).map_err(|e| e.to_string())?;

    mock.assert_all_requested().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::mock::{MockResponse, MockSetup};
    use crate::probe::ExpectedResponse;
    use crate::s3::MockObjectStore;

    fn probe_case(name: &str, mock: MockSetup, expected: ExpectedResponse) -> Case {
        Case::new(
            name,
            Action::Probe(ProbeCase {
                url: "https://teda.com/catalog".into(),
                mock,
                expected,
            }),
        )
        .tagged(Tag::Catalog)
    }

    #[tokio::test]
    async fn test_failed_dependency_skips_dependent() {
        let suite = Suite::new(vec![
            probe_case(
                "complete",
                MockSetup::Respond(MockResponse::new(500)),
                ExpectedResponse::status(200),
            ),
            probe_case(
                "product",
                MockSetup::Respond(MockResponse::new(200)),
                ExpectedResponse::status(200),
            )
            .depends_on("complete"),
        ])
        .unwrap();

        let runner: Runner<MockObjectStore> = Runner::without_storage("not configured");
        let report = runner.run(&suite, &[]).await.unwrap();

        assert!(matches!(report.outcome("complete"), Some(CaseOutcome::Failed(_))));
        assert!(matches!(report.outcome("product"), Some(CaseOutcome::Skipped(_))));
        assert!(!report.is_success());
        assert_eq!(report.summary(), "0 passed, 1 failed, 1 skipped");
    }

    #[tokio::test]
    async fn test_upload_fails_without_storage() {
        let suite = Suite::new(vec![
            Case::new(
                "upload",
                Action::Upload {
                    file: "catalog_data.csv".into(),
                },
            )
            .tagged(Tag::Uploader),
            probe_case(
                "complete",
                MockSetup::Respond(MockResponse::new(200)),
                ExpectedResponse::status(200),
            ),
        ])
        .unwrap();

        let runner: Runner<MockObjectStore> =
            Runner::without_storage("AWS_ACCESS_KEY_ID not set");
        let report = runner.run(&suite, &[]).await.unwrap();

        assert!(matches!(
            report.outcome("upload"),
            Some(CaseOutcome::Failed(reason)) if reason.contains("AWS_ACCESS_KEY_ID not set")
        ));
        assert_eq!(report.outcome("complete"), Some(&CaseOutcome::Passed));
        assert_eq!(report.skipped(), 0);
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_unselected_upload_is_not_reported() {
        let suite = Suite::new(vec![Case::new(
            "upload",
            Action::Upload {
                file: "catalog_data.csv".into(),
            },
        )
        .tagged(Tag::Uploader)])
        .unwrap();

        let runner: Runner<MockObjectStore> = Runner::without_storage("no credentials");
        let report = runner.run(&suite, &[Tag::Catalog]).await.unwrap();
        assert!(report.results().is_empty());
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_report_display() {
        let suite = Suite::new(vec![probe_case(
            "not-found",
            MockSetup::Respond(MockResponse::new(200)),
            ExpectedResponse::status(200),
        )])
        .unwrap();

        let runner: Runner<MockObjectStore> = Runner::without_storage("not configured");
        let report = runner.run(&suite, &[]).await.unwrap();
        assert_eq!(report.passed(), 1);

        let text = report.to_string();
        assert!(text.contains("PASSED"));
        assert!(text.ends_with("1 passed, 0 failed, 0 skipped"));
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = crate::upload::UploadError::MissingFile {
            path: "catalog_data.csv".into(),
            source: io,
        };
        assert!(error_chain(&err).contains("no such file"));
    }
}
