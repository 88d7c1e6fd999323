//! Centralized error types for stagehand
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use thiserror::Error;

/// Top-level error type for stagehand operations
#[derive(Error, Debug)]
pub enum StagehandError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Promotion error: {0}")]
    Promotion(#[from] PromotionError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),
}

/// Constraint schema violations
///
/// Every variant carries the full field path of the offending value
/// (e.g. `apps.example-app.deployment.replicas`) so the caller can
/// point at the exact line of the environment file.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Required configuration missing: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration value for {field}: {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Conflicting default for {field}: {reason}")]
    ConflictingDefault { field: String, reason: String },

    #[error("Environment file not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}

impl SchemaError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(
        field: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn conflicting(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConflictingDefault {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Promotion state machine errors
///
/// Any variant raised after the first file mutation implies the target
/// environment file has already been restored from its snapshot.
#[derive(Error, Debug)]
pub enum PromotionError {
    #[error("Source and target environment are both '{environment}'")]
    SameEnvironment { environment: String },

    #[error(
        "Ambiguous rewrite for {app}: expected exactly the image field to change, got {changed:?}"
    )]
    AmbiguousRewrite { app: String, changed: Vec<String> },

    #[error("Rewritten target failed schema validation (rolled back): {message}")]
    ValidationFailed { message: String },

    #[error(
        "Confirmation mismatch for {app}: expected image '{expected}', found '{found}' (rolled back)"
    )]
    ConfirmMismatch {
        app: String,
        expected: String,
        found: String,
    },

    #[error("--image-override names unknown application '{app}' (not in source environment)")]
    UnknownOverride { app: String },

    #[error("I/O failure on {path}: {message}")]
    Io { path: String, message: String },
}

/// Manifest generation driver errors
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error(
        "No resources generated for environment '{environment}' although applications were declared"
    )]
    EmptyOutput { environment: String },

    #[error("I/O failure on {path}: {message}")]
    Io { path: String, message: String },
}
