//! Domain error types.
//!
//! Each engine stage has its own enum so callers can match on the failure
//! class: configuration, runner, data or consistency.

use thiserror::Error;
use uuid::Uuid;

use crate::model::{ComponentType, SectionType};

/// Errors from module generation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No section definition for this name.
    #[error("unknown section: {0}")]
    UnknownSection(String),

    /// No component type with this wire name.
    #[error("unknown component type: {0}")]
    UnknownComponentType(String),

    /// Module numbers start at 1.
    #[error("invalid module number {0}, modules are numbered from 1")]
    InvalidModuleNumber(u32),

    /// Content-set ids for this module would not fit in a `u32`.
    #[error("module number {module_number} is out of range for {section}")]
    ModuleNumberOutOfRange {
        section: SectionType,
        module_number: u32,
    },

    /// A section definition breaks one of its own invariants.
    #[error("invalid definition for {section}: {reason}")]
    InvalidDefinition { section: SectionType, reason: String },
}

/// Errors that halt a module run. Nothing is scored after any of these.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// No runner registered for a component type in the module.
    #[error("no runner registered for component type '{0}'")]
    MissingRunner(ComponentType),

    /// The runner could not start the component.
    #[error("runner for '{component_type}' (set {content_set_id}) failed to initialize: {source}")]
    RunnerInit {
        component_type: ComponentType,
        content_set_id: u32,
        #[source]
        source: anyhow::Error,
    },

    /// The state machine was asked to do something its state forbids.
    #[error("invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },
}

/// Consistency errors detected while comparing two attempts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComparisonError {
    #[error("attempts belong to different sections: {first} vs {second}")]
    SectionMismatch {
        first: SectionType,
        second: SectionType,
    },

    #[error("per-question results differ in length: {first} vs {second}")]
    LengthMismatch { first: usize, second: usize },

    /// Questions answered correctly first time and wrong on the retake.
    #[error("previously correct questions became incorrect at {indices:?}")]
    Regressed { indices: Vec<usize> },

    #[error("retake scored lower than the first attempt: {first} -> {second}")]
    NegativeScoreDiff { first: u32, second: u32 },

    /// The retake ran content the first attempt never presented.
    #[error("retake contains {component_type} set {content_set_id}, which the first attempt did not")]
    UnexpectedComponent {
        component_type: ComponentType,
        content_set_id: u32,
    },
}

/// Errors from the retake flow.
#[derive(Debug, Error)]
pub enum RetakeError {
    #[error("no first attempt recorded for {0}")]
    NoFirstAttempt(SectionType),

    /// The stored first attempt was replaced while the retake was running.
    #[error("first attempt for {section} was superseded (expected {expected}, found {found})")]
    FirstAttemptSuperseded {
        section: SectionType,
        expected: Uuid,
        found: Uuid,
    },

    #[error("first attempt refers to unknown module '{0}'")]
    UnknownModule(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Comparison(#[from] ComparisonError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed store contents: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}
