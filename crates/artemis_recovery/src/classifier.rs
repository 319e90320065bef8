//! Keyword-based classification of failure descriptions.

use tracing::debug;

use crate::issue::{FailureReport, IssueType};

/// Ordered keyword table; the first matching rule wins, so more specific
/// phrases must come before the generic ones they contain ("llm timeout"
/// before "timeout", "zombie" before "process").
const RULES: &[(&str, IssueType)] = &[
    // LLM first: their messages often contain generic infrastructure words.
    ("rate limit", IssueType::LlmRateLimit),
    ("429", IssueType::LlmRateLimit),
    ("llm timeout", IssueType::LlmTimeout),
    ("model timed out", IssueType::LlmTimeout),
    ("invalid llm response", IssueType::InvalidLlmResponse),
    ("malformed response", IssueType::InvalidLlmResponse),
    ("unparseable response", IssueType::InvalidLlmResponse),
    ("llm api", IssueType::LlmApiError),
    ("api error", IssueType::LlmApiError),
    ("provider error", IssueType::LlmApiError),
    // Multi-agent
    ("deadlock", IssueType::ArbitrationDeadlock),
    ("arbitration", IssueType::ArbitrationDeadlock),
    ("developer conflict", IssueType::DeveloperConflict),
    ("agents disagree", IssueType::DeveloperConflict),
    ("messenger", IssueType::MessengerError),
    // Stage-specific
    ("architecture invalid", IssueType::ArchitectureInvalid),
    ("invalid architecture", IssueType::ArchitectureInvalid),
    ("review failed", IssueType::CodeReviewFailed),
    ("review rejected", IssueType::CodeReviewFailed),
    ("integration conflict", IssueType::IntegrationConflict),
    ("merge conflict", IssueType::IntegrationConflict),
    ("validation failed", IssueType::ValidationFailed),
    // Data
    ("invalid card", IssueType::InvalidCard),
    ("corrupted", IssueType::CorruptedState),
    ("corrupt state", IssueType::CorruptedState),
    ("rag", IssueType::RagError),
    ("vector index", IssueType::RagError),
    // Dependency before code: "import error" mentions modules too.
    ("no module named", IssueType::MissingDependency),
    ("missing dependency", IssueType::MissingDependency),
    ("package not found", IssueType::MissingDependency),
    ("version conflict", IssueType::VersionConflict),
    ("incompatible version", IssueType::VersionConflict),
    ("import error", IssueType::ImportError),
    ("importerror", IssueType::ImportError),
    // Code
    ("compilation", IssueType::CompilationError),
    ("compile error", IssueType::CompilationError),
    ("syntax error", IssueType::CompilationError),
    ("test failed", IssueType::TestFailure),
    ("tests failed", IssueType::TestFailure),
    ("assertion", IssueType::TestFailure),
    ("vulnerability", IssueType::SecurityVulnerability),
    ("cve-", IssueType::SecurityVulnerability),
    ("lint", IssueType::LintingError),
    // System before infrastructure: "zombie process" contains "process".
    ("zombie", IssueType::ZombieProcess),
    ("file lock", IssueType::FileLock),
    ("resource busy", IssueType::FileLock),
    ("permission denied", IssueType::PermissionDenied),
    ("access denied", IssueType::PermissionDenied),
    // Infrastructure
    ("hanging process", IssueType::HangingProcess),
    ("process hung", IssueType::HangingProcess),
    ("not responding", IssueType::HangingProcess),
    ("out of memory", IssueType::MemoryExhausted),
    ("oom", IssueType::MemoryExhausted),
    ("memory exhausted", IssueType::MemoryExhausted),
    ("disk full", IssueType::DiskFull),
    ("no space left", IssueType::DiskFull),
    ("network", IssueType::NetworkError),
    ("connection refused", IssueType::NetworkError),
    ("connection reset", IssueType::NetworkError),
    ("timed out", IssueType::Timeout),
    ("timeout", IssueType::Timeout),
];

/// Classifies free-text failure descriptions into issue types.
pub struct IssueClassifier;

impl IssueClassifier {
    /// Classify a failure report.
    ///
    /// A pre-classified report short-circuits; otherwise the description is
    /// scanned against the keyword table. Returns `None` when nothing
    /// matches, which sends the caller to the workflow generator.
    pub fn classify(report: &FailureReport) -> Option<IssueType> {
        if let Some(issue_type) = report.issue_type {
            return Some(issue_type);
        }

        let text = report.description.to_lowercase();
        let matched = RULES
            .iter()
            .find(|(keyword, _)| text.contains(keyword))
            .map(|(_, issue_type)| *issue_type);

        match matched {
            Some(issue_type) => debug!("Classified failure as {}: {}", issue_type, report.description),
            None => debug!("Failure did not match any issue type: {}", report.description),
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(description: &str) -> Option<IssueType> {
        IssueClassifier::classify(&FailureReport::new(description))
    }

    #[test]
    fn test_pre_classified_report_short_circuits() {
        let report = FailureReport::new("anything at all").with_issue_type(IssueType::DiskFull);
        assert_eq!(IssueClassifier::classify(&report), Some(IssueType::DiskFull));
    }

    #[test]
    fn test_specific_rules_beat_generic_ones() {
        assert_eq!(classify("LLM timeout after 120s"), Some(IssueType::LlmTimeout));
        assert_eq!(classify("subprocess timed out"), Some(IssueType::Timeout));
        assert_eq!(classify("zombie process detected"), Some(IssueType::ZombieProcess));
        assert_eq!(classify("process hung during build"), Some(IssueType::HangingProcess));
    }

    #[test]
    fn test_dependency_classification() {
        assert_eq!(
            classify("ModuleNotFoundError: no module named 'requests'"),
            Some(IssueType::MissingDependency)
        );
        assert_eq!(
            classify("version conflict: requires urllib3<2"),
            Some(IssueType::VersionConflict)
        );
    }

    #[test]
    fn test_llm_classification() {
        assert_eq!(classify("HTTP 429 from provider"), Some(IssueType::LlmRateLimit));
        assert_eq!(
            classify("malformed response from model"),
            Some(IssueType::InvalidLlmResponse)
        );
    }

    #[test]
    fn test_unmatched_returns_none() {
        assert_eq!(classify("the moon phase is unfavourable"), None);
    }
}
