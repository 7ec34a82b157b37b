//! Scripted component runner.
//!
//! Replays pre-recorded answers instead of driving a real UI. Used by the
//! CLI to run attempts from an answer sheet and by tests to exercise the
//! controller without a front end.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Answer, ComponentInstance, ComponentType};
use crate::traits::{ActiveComponent, ComponentRunner, SessionContext};

/// Recorded answers keyed by component type, then content-set id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet {
    entries: BTreeMap<ComponentType, BTreeMap<u32, Vec<bool>>>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, component_type: ComponentType, content_set_id: u32, answers: Vec<bool>) -> Self {
        self.insert(component_type, content_set_id, answers);
        self
    }

    pub fn insert(&mut self, component_type: ComponentType, content_set_id: u32, answers: Vec<bool>) {
        self.entries
            .entry(component_type)
            .or_default()
            .insert(content_set_id, answers);
    }

    pub fn get(&self, component_type: ComponentType, content_set_id: u32) -> Option<&[bool]> {
        self.entries
            .get(&component_type)
            .and_then(|sets| sets.get(&content_set_id))
            .map(Vec::as_slice)
    }

    /// Load a JSON answer sheet.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read answer sheet from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse answer sheet {}", path.display()))
    }
}

/// A runner that answers from an [`AnswerSheet`].
pub struct ScriptedRunner {
    sheet: AnswerSheet,
    /// Types whose instances never submit on their own.
    stalled: HashSet<ComponentType>,
    /// Types whose instances fail to initialize.
    broken: HashSet<ComponentType>,
    init_count: AtomicU32,
    started: Mutex<Vec<ComponentInstance>>,
}

impl ScriptedRunner {
    pub fn new(sheet: AnswerSheet) -> Self {
        Self {
            sheet,
            stalled: HashSet::new(),
            broken: HashSet::new(),
            init_count: AtomicU32::new(0),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Instances of these types wait for a forced submit.
    pub fn stalling(mut self, types: impl IntoIterator<Item = ComponentType>) -> Self {
        self.stalled.extend(types);
        self
    }

    /// Instances of these types fail in `init_component`.
    pub fn failing(mut self, types: impl IntoIterator<Item = ComponentType>) -> Self {
        self.broken.extend(types);
        self
    }

    /// Number of successful `init_component` calls.
    pub fn init_count(&self) -> u32 {
        self.init_count.load(Ordering::Relaxed)
    }

    /// Instances started so far, in order.
    pub fn started(&self) -> Vec<ComponentInstance> {
        self.started
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ComponentRunner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn init_component(
        &self,
        instance: &ComponentInstance,
        session: &SessionContext,
    ) -> Result<Box<dyn ActiveComponent>> {
        if self.broken.contains(&instance.component_type) {
            anyhow::bail!(
                "no content for {} set {}",
                instance.component_type,
                instance.content_set_id
            );
        }

        tracing::debug!(
            module = %session.module_id,
            index = session.component_index,
            "scripted {} set {}",
            instance.component_type,
            instance.content_set_id
        );

        self.init_count.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut started) = self.started.lock() {
            started.push(*instance);
        }

        let answers = self
            .sheet
            .get(instance.component_type, instance.content_set_id)
            .map(|a| a.iter().copied().map(Answer::new).collect())
            .unwrap_or_default();

        Ok(Box::new(ScriptedComponent {
            answers,
            stalled: self.stalled.contains(&instance.component_type),
        }))
    }
}

struct ScriptedComponent {
    answers: Vec<Answer>,
    stalled: bool,
}

#[async_trait]
impl ActiveComponent for ScriptedComponent {
    async fn submitted(&mut self) -> Vec<Answer> {
        if self.stalled {
            std::future::pending::<()>().await;
        }
        std::mem::take(&mut self.answers)
    }

    fn force_submit(&mut self) -> Vec<Answer> {
        std::mem::take(&mut self.answers)
    }
}
