//! Trait seams to the component runners that live outside the core.
//!
//! A runner renders and drives one component instance; the core only ever
//! sees the `isCorrect` flag of what it hands back.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{Answer, ComponentInstance, ComponentType, SectionType};

// ---------------------------------------------------------------------------
// Runner traits
// ---------------------------------------------------------------------------

/// Starts component instances of one or more component types.
#[async_trait]
pub trait ComponentRunner: Send + Sync {
    /// Human-readable runner name for diagnostics.
    fn name(&self) -> &str;

    /// Begin interaction for one instance.
    async fn init_component(
        &self,
        instance: &ComponentInstance,
        session: &SessionContext,
    ) -> anyhow::Result<Box<dyn ActiveComponent>>;
}

/// A component instance that is currently running.
#[async_trait]
pub trait ActiveComponent: Send {
    /// Resolves when the user submits.
    async fn submitted(&mut self) -> Vec<Answer>;

    /// Collect whatever has been answered so far. Called on timer expiry.
    fn force_submit(&mut self) -> Vec<Answer>;
}

// ---------------------------------------------------------------------------
// Session context
// ---------------------------------------------------------------------------

/// Explicit per-run context, owned by the controller and lent to the active
/// runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub module_id: String,
    pub section: SectionType,
    /// Index of the running instance within the module.
    pub component_index: usize,
    pub component_count: usize,
    /// Zero-based number of the instance's first question within the module.
    pub question_offset: u32,
    pub total_questions: u32,
}

// ---------------------------------------------------------------------------
// Runner set
// ---------------------------------------------------------------------------

/// Runners keyed by the component type they handle.
#[derive(Clone, Default)]
pub struct RunnerSet {
    runners: HashMap<ComponentType, Arc<dyn ComponentRunner>>,
}

impl RunnerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one runner for every listed type.
    pub fn with_runner(
        mut self,
        types: impl IntoIterator<Item = ComponentType>,
        runner: Arc<dyn ComponentRunner>,
    ) -> Self {
        for t in types {
            self.runners.insert(t, Arc::clone(&runner));
        }
        self
    }

    /// Register one runner for all known types.
    pub fn uniform(runner: Arc<dyn ComponentRunner>) -> Self {
        Self::new().with_runner(ComponentType::ALL, runner)
    }

    pub fn get(&self, component_type: ComponentType) -> Option<&Arc<dyn ComponentRunner>> {
        self.runners.get(&component_type)
    }
}

impl std::fmt::Debug for RunnerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.runners.keys().map(|t| t.as_str()).collect();
        types.sort_unstable();
        f.debug_struct("RunnerSet").field("types", &types).finish()
    }
}
