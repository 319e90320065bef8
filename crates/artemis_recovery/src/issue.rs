//! Failure taxonomy for the recovery engine.
//!
//! Every stage failure is classified into one `IssueType`; each issue type
//! maps to exactly one recovery workflow in the catalog. The set is closed:
//! failures that match nothing fall through to the workflow generator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Broad grouping of issue types, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueDomain {
    Infrastructure,
    Code,
    Dependency,
    Llm,
    Stage,
    MultiAgent,
    Data,
    System,
}

/// Closed set of failure categories the catalog knows how to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    // Infrastructure
    Timeout,
    HangingProcess,
    MemoryExhausted,
    DiskFull,
    NetworkError,
    // Code
    CompilationError,
    TestFailure,
    SecurityVulnerability,
    LintingError,
    // Dependency
    MissingDependency,
    VersionConflict,
    ImportError,
    // LLM
    LlmApiError,
    LlmTimeout,
    LlmRateLimit,
    InvalidLlmResponse,
    // Stage-specific
    ArchitectureInvalid,
    CodeReviewFailed,
    IntegrationConflict,
    ValidationFailed,
    // Multi-agent
    ArbitrationDeadlock,
    DeveloperConflict,
    MessengerError,
    // Data
    InvalidCard,
    CorruptedState,
    RagError,
    // System
    ZombieProcess,
    FileLock,
    PermissionDenied,
}

impl IssueType {
    /// Every issue type, in catalog order.
    pub fn all() -> &'static [IssueType] {
        use IssueType::*;
        &[
            Timeout,
            HangingProcess,
            MemoryExhausted,
            DiskFull,
            NetworkError,
            CompilationError,
            TestFailure,
            SecurityVulnerability,
            LintingError,
            MissingDependency,
            VersionConflict,
            ImportError,
            LlmApiError,
            LlmTimeout,
            LlmRateLimit,
            InvalidLlmResponse,
            ArchitectureInvalid,
            CodeReviewFailed,
            IntegrationConflict,
            ValidationFailed,
            ArbitrationDeadlock,
            DeveloperConflict,
            MessengerError,
            InvalidCard,
            CorruptedState,
            RagError,
            ZombieProcess,
            FileLock,
            PermissionDenied,
        ]
    }

    pub fn domain(self) -> IssueDomain {
        use IssueType::*;
        match self {
            Timeout | HangingProcess | MemoryExhausted | DiskFull | NetworkError => {
                IssueDomain::Infrastructure
            }
            CompilationError | TestFailure | SecurityVulnerability | LintingError => {
                IssueDomain::Code
            }
            MissingDependency | VersionConflict | ImportError => IssueDomain::Dependency,
            LlmApiError | LlmTimeout | LlmRateLimit | InvalidLlmResponse => IssueDomain::Llm,
            ArchitectureInvalid | CodeReviewFailed | IntegrationConflict | ValidationFailed => {
                IssueDomain::Stage
            }
            ArbitrationDeadlock | DeveloperConflict | MessengerError => IssueDomain::MultiAgent,
            InvalidCard | CorruptedState | RagError => IssueDomain::Data,
            ZombieProcess | FileLock | PermissionDenied => IssueDomain::System,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use IssueType::*;
        match self {
            Timeout => "timeout",
            HangingProcess => "hanging_process",
            MemoryExhausted => "memory_exhausted",
            DiskFull => "disk_full",
            NetworkError => "network_error",
            CompilationError => "compilation_error",
            TestFailure => "test_failure",
            SecurityVulnerability => "security_vulnerability",
            LintingError => "linting_error",
            MissingDependency => "missing_dependency",
            VersionConflict => "version_conflict",
            ImportError => "import_error",
            LlmApiError => "llm_api_error",
            LlmTimeout => "llm_timeout",
            LlmRateLimit => "llm_rate_limit",
            InvalidLlmResponse => "invalid_llm_response",
            ArchitectureInvalid => "architecture_invalid",
            CodeReviewFailed => "code_review_failed",
            IntegrationConflict => "integration_conflict",
            ValidationFailed => "validation_failed",
            ArbitrationDeadlock => "arbitration_deadlock",
            DeveloperConflict => "developer_conflict",
            MessengerError => "messenger_error",
            InvalidCard => "invalid_card",
            CorruptedState => "corrupted_state",
            RagError => "rag_error",
            ZombieProcess => "zombie_process",
            FileLock => "file_lock",
            PermissionDenied => "permission_denied",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Description of a stage failure handed to the recovery engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    /// Free-text failure description, used for classification.
    pub description: String,
    /// Stage that failed, when known.
    pub stage_name: Option<String>,
    /// Pre-classified issue type, when the caller already knows it.
    pub issue_type: Option<IssueType>,
    /// Handler-specific details (pid, package, file path, ...).
    pub details: HashMap<String, serde_json::Value>,
}

impl FailureReport {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            stage_name: None,
            issue_type: None,
            details: HashMap::new(),
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage_name = Some(stage.into());
        self
    }

    pub fn with_issue_type(mut self, issue_type: IssueType) -> Self {
        self.issue_type = Some(issue_type);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}
