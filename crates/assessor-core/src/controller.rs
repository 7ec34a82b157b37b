//! Sequential module executor.
//!
//! Runs the components of one generated module strictly one after another,
//! racing each against its countdown and an abort signal, and yields one
//! aggregated [`ModuleResult`] when the sequence is exhausted.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::ControllerError;
use crate::model::{Answer, ComponentInstance, ComponentResult, GeneratedModule, ModuleResult};
use crate::traits::{RunnerSet, SessionContext};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Execution state of a module run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Idle,
    /// Index of the running component.
    Running(usize),
    Completed,
    Aborted,
    /// A runner was missing or failed to start.
    Halted,
}

/// Inputs to [`ModuleState::next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleEvent {
    Start,
    ComponentFinished,
    Abort,
    RunnerFailed,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleState::Idle => write!(f, "idle"),
            ModuleState::Running(i) => write!(f, "running({i})"),
            ModuleState::Completed => write!(f, "completed"),
            ModuleState::Aborted => write!(f, "aborted"),
            ModuleState::Halted => write!(f, "halted"),
        }
    }
}

impl ModuleState {
    /// The single transition function. `component_count` is the length of
    /// the module's component sequence.
    pub fn next(self, event: ModuleEvent, component_count: usize) -> Result<Self, ControllerError> {
        use ModuleEvent as E;
        use ModuleState as S;

        match (self, event) {
            (S::Idle, E::Start) if component_count == 0 => Ok(S::Completed),
            (S::Idle, E::Start) => Ok(S::Running(0)),
            (S::Running(i), E::ComponentFinished) if i + 1 < component_count => {
                Ok(S::Running(i + 1))
            }
            (S::Running(_), E::ComponentFinished) => Ok(S::Completed),
            (S::Idle | S::Running(_), E::Abort) => Ok(S::Aborted),
            (S::Running(_), E::RunnerFailed) => Ok(S::Halted),
            (from, event) => Err(ControllerError::InvalidTransition {
                from: from.to_string(),
                event: format!("{event:?}"),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ModuleState::Completed | ModuleState::Aborted | ModuleState::Halted
        )
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Callback invoked once with the finished result. Never called for an
/// aborted or halted run.
pub type OnComplete = Box<dyn FnOnce(&ModuleResult) + Send>;

/// How a module run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleOutcome {
    Completed(ModuleResult),
    Aborted,
}

impl ModuleOutcome {
    pub fn into_result(self) -> Option<ModuleResult> {
        match self {
            ModuleOutcome::Completed(r) => Some(r),
            ModuleOutcome::Aborted => None,
        }
    }
}

/// Requests cooperative cancellation of a running module from anywhere.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }
}

enum Ending {
    Submitted(Vec<Answer>),
    Expired,
    Aborted,
}

/// Drives one [`GeneratedModule`] to completion.
pub struct ModuleController {
    module: GeneratedModule,
    runners: RunnerSet,
    enforce_time_limits: bool,
    state: ModuleState,
    on_complete: Option<OnComplete>,
    abort_tx: Arc<watch::Sender<bool>>,
    abort_rx: watch::Receiver<bool>,
}

impl ModuleController {
    pub fn new(module: GeneratedModule, runners: RunnerSet) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            module,
            runners,
            enforce_time_limits: true,
            state: ModuleState::Idle,
            on_complete: None,
            abort_tx: Arc::new(tx),
            abort_rx: rx,
        }
    }

    /// Disable all countdowns when `false`.
    pub fn with_time_limits(mut self, enforce: bool) -> Self {
        self.enforce_time_limits = enforce;
        self
    }

    pub fn set_on_complete(&mut self, callback: impl FnOnce(&ModuleResult) + Send + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            tx: Arc::clone(&self.abort_tx),
        }
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub fn module(&self) -> &GeneratedModule {
        &self.module
    }

    fn transition(&mut self, event: ModuleEvent) -> Result<(), ControllerError> {
        self.state = self.state.next(event, self.module.components.len())?;
        Ok(())
    }

    /// Run every component in order.
    ///
    /// Returns `Err` when a runner is missing or fails to start; the partial
    /// result is discarded in that case.
    pub async fn start_module(&mut self) -> Result<ModuleOutcome, ControllerError> {
        if *self.abort_rx.borrow() {
            self.transition(ModuleEvent::Abort)?;
            tracing::info!("module {} aborted before start", self.module.module_id);
            return Ok(ModuleOutcome::Aborted);
        }

        self.transition(ModuleEvent::Start)?;
        tracing::info!(
            "starting {} ({} components, {} questions)",
            self.module.module_id,
            self.module.components.len(),
            self.module.total_questions
        );

        let module_deadline = self
            .module
            .time_limit()
            .filter(|_| self.enforce_time_limits)
            .map(|limit| Instant::now() + limit);

        let mut result = ModuleResult::empty(&self.module);
        let mut question_offset = 0u32;

        while let ModuleState::Running(index) = self.state {
            let instance = self.module.components[index];
            let session = SessionContext {
                module_id: self.module.module_id.clone(),
                section: self.module.section_type,
                component_index: index,
                component_count: self.module.components.len(),
                question_offset,
                total_questions: self.module.total_questions,
            };

            match self.run_component(&instance, &session, module_deadline).await {
                Ok(Some(answers)) => {
                    let component_result = ComponentResult::new(&instance, answers);
                    tracing::debug!(
                        "{} set {} finished: {}/{} correct",
                        instance.component_type,
                        instance.content_set_id,
                        component_result.correct_count(),
                        component_result.question_count
                    );
                    result.component_results.push(component_result);
                    question_offset += instance.questions_per_instance;
                    self.transition(ModuleEvent::ComponentFinished)?;
                }
                Ok(None) => {
                    self.transition(ModuleEvent::Abort)?;
                    tracing::info!(
                        "module {} aborted at component {index}",
                        self.module.module_id
                    );
                    return Ok(ModuleOutcome::Aborted);
                }
                Err(e) => {
                    self.transition(ModuleEvent::RunnerFailed)?;
                    tracing::error!("module {} halted: {e:#}", self.module.module_id);
                    return Err(e);
                }
            }
        }

        tracing::info!(
            "module {} completed with {} component results",
            self.module.module_id,
            result.component_results.len()
        );
        if let Some(callback) = self.on_complete.take() {
            callback(&result);
        }
        Ok(ModuleOutcome::Completed(result))
    }

    /// Run one component. `Ok(None)` means the run was aborted.
    async fn run_component(
        &self,
        instance: &ComponentInstance,
        session: &SessionContext,
        module_deadline: Option<Instant>,
    ) -> Result<Option<Vec<Answer>>, ControllerError> {
        let runner = self
            .runners
            .get(instance.component_type)
            .cloned()
            .ok_or(ControllerError::MissingRunner(instance.component_type))?;
        tracing::debug!(
            "component {}/{}: {} set {} via {}",
            session.component_index + 1,
            session.component_count,
            instance.component_type,
            instance.content_set_id,
            runner.name()
        );

        let init = tokio::select! {
            biased;
            _ = wait_for_abort(self.abort_rx.clone()) => return Ok(None),
            init = runner.init_component(instance, session) => init,
        };
        let mut active = init.map_err(|source| ControllerError::RunnerInit {
            component_type: instance.component_type,
            content_set_id: instance.content_set_id,
            source,
        })?;

        let countdown = self.countdown_deadline(instance, module_deadline);

        let ending = tokio::select! {
            biased;
            _ = wait_for_abort(self.abort_rx.clone()) => Ending::Aborted,
            answers = active.submitted() => Ending::Submitted(answers),
            _ = sleep_until(countdown) => Ending::Expired,
        };

        match ending {
            Ending::Submitted(answers) => Ok(Some(answers)),
            Ending::Expired => {
                tracing::warn!(
                    "countdown expired for {} set {}, forcing submit",
                    instance.component_type,
                    instance.content_set_id
                );
                Ok(Some(active.force_submit()))
            }
            Ending::Aborted => Ok(None),
        }
    }

    /// The earlier of the component's own countdown and the module deadline.
    fn countdown_deadline(
        &self,
        instance: &ComponentInstance,
        module_deadline: Option<Instant>,
    ) -> Option<Instant> {
        if !self.enforce_time_limits {
            return None;
        }
        let own = instance
            .component_type
            .instance_countdown(instance.questions_per_instance)
            .map(|d| Instant::now() + d);
        match (own, module_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(t) => tokio::time::sleep_until(t).await,
        None => std::future::pending().await,
    }
}

async fn wait_for_abort(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;
    use crate::model::{ComponentType, SectionType};
    use crate::registry::generate_module;
    use crate::scripted::{AnswerSheet, ScriptedRunner};
    use crate::traits::{ActiveComponent, ComponentRunner};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn reading_sheet() -> AnswerSheet {
        AnswerSheet::new()
            .with(ComponentType::CompleteTheWords, 1, vec![true; 10])
            .with(ComponentType::CompleteTheWords, 2, vec![true, false, true, true, true, true, true, true, true, true])
            .with(ComponentType::DailyLifeShort, 1, vec![true, true])
            .with(ComponentType::DailyLifeShort, 2, vec![false, true])
            .with(ComponentType::DailyLifeLong, 1, vec![true, true, true])
            .with(ComponentType::DailyLifeLong, 2, vec![true, true, false])
            .with(ComponentType::AcademicPassage, 1, vec![true, true, true, true, false])
    }

    #[test]
    fn transitions() {
        use ModuleEvent as E;
        use ModuleState as S;

        assert_eq!(S::Idle.next(E::Start, 3).unwrap(), S::Running(0));
        assert_eq!(S::Idle.next(E::Start, 0).unwrap(), S::Completed);
        assert_eq!(S::Running(0).next(E::ComponentFinished, 3).unwrap(), S::Running(1));
        assert_eq!(S::Running(2).next(E::ComponentFinished, 3).unwrap(), S::Completed);
        assert_eq!(S::Running(1).next(E::Abort, 3).unwrap(), S::Aborted);
        assert_eq!(S::Idle.next(E::Abort, 3).unwrap(), S::Aborted);
        assert_eq!(S::Running(1).next(E::RunnerFailed, 3).unwrap(), S::Halted);

        assert!(S::Idle.next(E::ComponentFinished, 3).is_err());
        assert!(S::Running(0).next(E::Start, 3).is_err());
        for terminal in [S::Completed, S::Aborted, S::Halted] {
            assert!(terminal.is_terminal());
            for event in [E::Start, E::ComponentFinished, E::Abort, E::RunnerFailed] {
                assert!(terminal.next(event, 3).is_err(), "{terminal} on {event:?}");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_components_in_order_and_reports_once() {
        let module = generate_module(SectionType::Reading, 1).unwrap();
        let runner = Arc::new(ScriptedRunner::new(reading_sheet()));
        let mut controller = ModuleController::new(module.clone(), RunnerSet::uniform(runner.clone()));

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        controller.set_on_complete(move |result| {
            assert_eq!(result.component_results.len(), 7);
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let outcome = controller.start_module().await.unwrap();
        let result = outcome.into_result().expect("completed");

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.state(), ModuleState::Completed);
        assert_eq!(runner.started(), module.components);
        assert_eq!(result.module_id, "reading_module_1");
        assert_eq!(result.question_results().len(), 35);
        assert_eq!(result.question_results().iter().filter(|&&c| c).count(), 31);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_countdown_forces_submit() {
        let module = generate_module(SectionType::Listening, 1).unwrap();
        let mut sheet = AnswerSheet::new();
        for set in 1..=10 {
            sheet.insert(ComponentType::ChooseResponse, set, vec![set % 2 == 0]);
        }
        let runner = Arc::new(
            ScriptedRunner::new(sheet).stalling([ComponentType::ChooseResponse]),
        );
        let mut controller = ModuleController::new(module, RunnerSet::uniform(runner));

        let started = Instant::now();
        let result = controller.start_module().await.unwrap().into_result().unwrap();

        // Ten 20s countdowns ran out; every other component submitted at once.
        assert_eq!(started.elapsed(), Duration::from_secs(200));
        let responses: Vec<bool> = result.question_results().into_iter().take(10).collect();
        assert_eq!(responses.iter().filter(|&&c| c).count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn section_time_limit_bounds_whole_module() {
        let module = generate_module(SectionType::Reading, 1).unwrap();
        let runner = Arc::new(ScriptedRunner::new(reading_sheet()).stalling(ComponentType::ALL));
        let mut controller = ModuleController::new(module, RunnerSet::uniform(runner));

        let started = Instant::now();
        let result = controller.start_module().await.unwrap().into_result().unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(1800));
        assert_eq!(result.component_results.len(), 7);
        assert_eq!(result.question_results().iter().filter(|&&c| c).count(), 31);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_suppresses_completion() {
        let module = generate_module(SectionType::Reading, 1).unwrap();
        let runner = Arc::new(ScriptedRunner::new(reading_sheet()).stalling([ComponentType::DailyLifeShort]));
        let mut controller =
            ModuleController::new(module, RunnerSet::uniform(runner.clone())).with_time_limits(false);

        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        controller.set_on_complete(move |_| flag.store(true, Ordering::SeqCst));

        let handle = controller.abort_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            handle.abort();
        });

        let outcome = controller.start_module().await.unwrap();
        assert_eq!(outcome, ModuleOutcome::Aborted);
        assert_eq!(controller.state(), ModuleState::Aborted);
        assert!(!called.load(Ordering::SeqCst));
        // Stalled at the first daily-life component.
        assert_eq!(runner.init_count(), 3);

        let err = controller.start_module().await.unwrap_err();
        assert!(matches!(err, ControllerError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn abort_before_start_runs_nothing() {
        let module = generate_module(SectionType::Speaking, 1).unwrap();
        let runner = Arc::new(ScriptedRunner::new(AnswerSheet::new()));
        let mut controller = ModuleController::new(module, RunnerSet::uniform(runner.clone()));
        controller.abort_handle().abort();

        assert_eq!(controller.start_module().await.unwrap(), ModuleOutcome::Aborted);
        assert_eq!(runner.init_count(), 0);
    }

    #[tokio::test]
    async fn missing_runner_halts() {
        let module = generate_module(SectionType::Writing, 1).unwrap();
        let runner: Arc<ScriptedRunner> = Arc::new(ScriptedRunner::new(AnswerSheet::new()));
        let runners = RunnerSet::new().with_runner(
            [ComponentType::BuildSentence, ComponentType::Email],
            runner,
        );
        let mut controller = ModuleController::new(module, runners);
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        controller.set_on_complete(move |_| flag.store(true, Ordering::SeqCst));

        let err = controller.start_module().await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::MissingRunner(ComponentType::AcademicDiscussion)
        ));
        assert_eq!(controller.state(), ModuleState::Halted);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn runner_init_failure_halts() {
        let module = generate_module(SectionType::Speaking, 2).unwrap();
        let runner = Arc::new(ScriptedRunner::new(AnswerSheet::new()).failing([ComponentType::Interview]));
        let mut controller = ModuleController::new(module, RunnerSet::uniform(runner));

        match controller.start_module().await {
            Err(ControllerError::RunnerInit {
                component_type,
                content_set_id,
                ..
            }) => {
                assert_eq!(component_type, ComponentType::Interview);
                assert_eq!(content_set_id, 2);
            }
            other => panic!("expected RunnerInit, got {other:?}"),
        }
        assert_eq!(controller.state(), ModuleState::Halted);
    }

    /// Never finishes initializing.
    struct HangingRunner;

    #[async_trait::async_trait]
    impl ComponentRunner for HangingRunner {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn init_component(
            &self,
            _instance: &ComponentInstance,
            _session: &SessionContext,
        ) -> anyhow::Result<Box<dyn ActiveComponent>> {
            std::future::pending().await
        }
    }

    fn timed_responses(time_limit_secs: u64) -> GeneratedModule {
        let response = |content_set_id| ComponentInstance {
            component_type: ComponentType::ChooseResponse,
            content_set_id,
            questions_per_instance: 1,
        };
        GeneratedModule {
            module_id: "listening_module_1".into(),
            module_name: "Listening Module 1".into(),
            section_type: SectionType::Listening,
            module_number: 1,
            total_questions: 3,
            time_limit_secs: Some(time_limit_secs),
            components: vec![response(1), response(2), response(3)],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn abort_while_runner_initializes() {
        let module = generate_module(SectionType::Speaking, 1).unwrap();
        let mut controller =
            ModuleController::new(module, RunnerSet::uniform(Arc::new(HangingRunner)));

        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        controller.set_on_complete(move |_| flag.store(true, Ordering::SeqCst));

        let handle = controller.abort_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            handle.abort();
        });

        let started = Instant::now();
        assert_eq!(controller.start_module().await.unwrap(), ModuleOutcome::Aborted);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(controller.state(), ModuleState::Aborted);
        assert!(!called.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn section_deadline_cuts_last_countdown_short() {
        let sheet = (1..=3).fold(AnswerSheet::new(), |sheet, set| {
            sheet.with(ComponentType::ChooseResponse, set, vec![true])
        });
        let runner = Arc::new(ScriptedRunner::new(sheet).stalling([ComponentType::ChooseResponse]));
        let mut controller = ModuleController::new(timed_responses(45), RunnerSet::uniform(runner));

        let started = Instant::now();
        let result = controller.start_module().await.unwrap().into_result().unwrap();

        // 20s + 20s, then only 5s of the third 20s countdown remain.
        assert_eq!(started.elapsed(), Duration::from_secs(45));
        assert_eq!(result.question_results(), vec![true, true, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_is_earlier_of_own_and_section_deadline() {
        let module = timed_responses(45);
        let instance = ComponentInstance {
            component_type: ComponentType::Conversation,
            content_set_id: 1,
            questions_per_instance: 2,
        };
        let controller = ModuleController::new(module.clone(), RunnerSet::new());
        let now = Instant::now();

        let soon = now + Duration::from_secs(10);
        assert_eq!(controller.countdown_deadline(&instance, Some(soon)), Some(soon));

        let later = now + Duration::from_secs(100);
        assert_eq!(
            controller.countdown_deadline(&instance, Some(later)),
            Some(now + Duration::from_secs(60))
        );
        assert_eq!(
            controller.countdown_deadline(&instance, None),
            Some(now + Duration::from_secs(60))
        );

        let untimed = ComponentInstance {
            component_type: ComponentType::AcademicTalk,
            ..instance
        };
        assert_eq!(controller.countdown_deadline(&untimed, Some(soon)), Some(soon));
        assert_eq!(controller.countdown_deadline(&untimed, None), None);

        let relaxed = ModuleController::new(module, RunnerSet::new()).with_time_limits(false);
        assert_eq!(relaxed.countdown_deadline(&instance, Some(soon)), None);
    }
}
