//! Core data model types for assessor.
//!
//! Sections, component types, generated modules and the results produced
//! by running them. Everything that crosses the persistence boundary
//! serializes with camelCase field names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::RegistryError;

/// One of the four test sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Reading,
    Listening,
    Writing,
    Speaking,
}

impl SectionType {
    pub const ALL: [SectionType; 4] = [
        SectionType::Reading,
        SectionType::Listening,
        SectionType::Writing,
        SectionType::Speaking,
    ];

    /// Lowercase identifier used in module ids and store keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionType::Reading => "reading",
            SectionType::Listening => "listening",
            SectionType::Writing => "writing",
            SectionType::Speaking => "speaking",
        }
    }

    /// Capitalized name for display.
    pub fn title(&self) -> &'static str {
        match self {
            SectionType::Reading => "Reading",
            SectionType::Listening => "Listening",
            SectionType::Writing => "Writing",
            SectionType::Speaking => "Speaking",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reading" => Ok(SectionType::Reading),
            "listening" => Ok(SectionType::Listening),
            "writing" => Ok(SectionType::Writing),
            "speaking" => Ok(SectionType::Speaking),
            other => Err(RegistryError::UnknownSection(other.to_string())),
        }
    }
}

/// Every known component type. Each belongs to exactly one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentType {
    /// Complete the words in a passage.
    #[serde(rename = "fillblanks")]
    CompleteTheWords,
    /// Short everyday text (notice, message).
    #[serde(rename = "daily1")]
    DailyLifeShort,
    /// Longer everyday text (email, schedule).
    #[serde(rename = "daily2")]
    DailyLifeLong,
    #[serde(rename = "academic")]
    AcademicPassage,
    /// Hear a prompt, choose the best reply.
    #[serde(rename = "response")]
    ChooseResponse,
    #[serde(rename = "conversation")]
    Conversation,
    #[serde(rename = "announcement")]
    Announcement,
    #[serde(rename = "lecture")]
    AcademicTalk,
    #[serde(rename = "buildsentence")]
    BuildSentence,
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "discussion")]
    AcademicDiscussion,
    #[serde(rename = "repeat")]
    ListenRepeat,
    #[serde(rename = "interview")]
    Interview,
}

impl ComponentType {
    pub const ALL: [ComponentType; 13] = [
        ComponentType::CompleteTheWords,
        ComponentType::DailyLifeShort,
        ComponentType::DailyLifeLong,
        ComponentType::AcademicPassage,
        ComponentType::ChooseResponse,
        ComponentType::Conversation,
        ComponentType::Announcement,
        ComponentType::AcademicTalk,
        ComponentType::BuildSentence,
        ComponentType::Email,
        ComponentType::AcademicDiscussion,
        ComponentType::ListenRepeat,
        ComponentType::Interview,
    ];

    /// Wire identifier (matches the serde name).
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentType::CompleteTheWords => "fillblanks",
            ComponentType::DailyLifeShort => "daily1",
            ComponentType::DailyLifeLong => "daily2",
            ComponentType::AcademicPassage => "academic",
            ComponentType::ChooseResponse => "response",
            ComponentType::Conversation => "conversation",
            ComponentType::Announcement => "announcement",
            ComponentType::AcademicTalk => "lecture",
            ComponentType::BuildSentence => "buildsentence",
            ComponentType::Email => "email",
            ComponentType::AcademicDiscussion => "discussion",
            ComponentType::ListenRepeat => "repeat",
            ComponentType::Interview => "interview",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ComponentType::CompleteTheWords => "Complete the Words",
            ComponentType::DailyLifeShort => "Read in Daily Life (short)",
            ComponentType::DailyLifeLong => "Read in Daily Life (long)",
            ComponentType::AcademicPassage => "Read an Academic Passage",
            ComponentType::ChooseResponse => "Listen and Choose a Response",
            ComponentType::Conversation => "Listen to a Conversation",
            ComponentType::Announcement => "Listen to an Announcement",
            ComponentType::AcademicTalk => "Listen to an Academic Talk",
            ComponentType::BuildSentence => "Build a Sentence",
            ComponentType::Email => "Write an Email",
            ComponentType::AcademicDiscussion => "Academic Discussion",
            ComponentType::ListenRepeat => "Listen and Repeat",
            ComponentType::Interview => "Take an Interview",
        }
    }

    pub fn section(&self) -> SectionType {
        match self {
            ComponentType::CompleteTheWords
            | ComponentType::DailyLifeShort
            | ComponentType::DailyLifeLong
            | ComponentType::AcademicPassage => SectionType::Reading,
            ComponentType::ChooseResponse
            | ComponentType::Conversation
            | ComponentType::Announcement
            | ComponentType::AcademicTalk => SectionType::Listening,
            ComponentType::BuildSentence
            | ComponentType::Email
            | ComponentType::AcademicDiscussion => SectionType::Writing,
            ComponentType::ListenRepeat | ComponentType::Interview => SectionType::Speaking,
        }
    }

    /// Fixed per-question countdown carried by the type itself, independent
    /// of any section time limit.
    pub fn per_question_countdown(&self) -> Option<Duration> {
        match self {
            ComponentType::ChooseResponse => Some(Duration::from_secs(20)),
            ComponentType::Conversation | ComponentType::Announcement => {
                Some(Duration::from_secs(30))
            }
            ComponentType::CompleteTheWords
            | ComponentType::DailyLifeShort
            | ComponentType::DailyLifeLong
            | ComponentType::AcademicPassage
            | ComponentType::AcademicTalk
            | ComponentType::BuildSentence
            | ComponentType::Email
            | ComponentType::AcademicDiscussion
            | ComponentType::ListenRepeat
            | ComponentType::Interview => None,
        }
    }

    /// Countdown for one instance with `questions` questions.
    pub fn instance_countdown(&self, questions: u32) -> Option<Duration> {
        self.per_question_countdown().map(|d| d * questions)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ComponentType::ALL
            .into_iter()
            .find(|t| t.as_str() == needle)
            .ok_or(RegistryError::UnknownComponentType(needle))
    }
}

/// How a slot assigns content-set ids across modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdPolicy {
    /// Each module consumes `repeat_count` fresh ids.
    PerRepeat,
    /// Stride 1: the id is keyed directly to the module number.
    ModuleKeyed,
}

/// One entry of a section's component structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSlot {
    pub component_type: ComponentType,
    pub repeat_count: u32,
    pub questions_per_instance: u32,
    pub id_policy: IdPolicy,
    /// First content-set id of the series (module 1).
    pub id_base: u32,
}

impl ComponentSlot {
    pub const fn per_repeat(component_type: ComponentType, repeat: u32, questions: u32) -> Self {
        Self {
            component_type,
            repeat_count: repeat,
            questions_per_instance: questions,
            id_policy: IdPolicy::PerRepeat,
            id_base: 1,
        }
    }

    pub const fn module_keyed(component_type: ComponentType, questions: u32) -> Self {
        Self {
            component_type,
            repeat_count: 1,
            questions_per_instance: questions,
            id_policy: IdPolicy::ModuleKeyed,
            id_base: 1,
        }
    }

    /// Number of ids one module advances this slot's series by.
    pub fn stride(&self) -> u32 {
        match self.id_policy {
            IdPolicy::PerRepeat => self.repeat_count,
            IdPolicy::ModuleKeyed => 1,
        }
    }
}

/// Immutable per-section constants.
#[derive(Debug, Clone, Copy)]
pub struct SectionDefinition {
    pub section: SectionType,
    pub total_questions: u32,
    pub time_limit_secs: Option<u64>,
    pub component_structure: &'static [ComponentSlot],
}

/// A module produced by the registry. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedModule {
    pub module_id: String,
    pub module_name: String,
    pub section_type: SectionType,
    pub module_number: u32,
    pub total_questions: u32,
    #[serde(default)]
    pub time_limit_secs: Option<u64>,
    pub components: Vec<ComponentInstance>,
}

impl GeneratedModule {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    /// Content-set ids assigned to `component_type`, in execution order.
    pub fn content_set_ids(&self, component_type: ComponentType) -> Vec<u32> {
        self.components
            .iter()
            .filter(|c| c.component_type == component_type)
            .map(|c| c.content_set_id)
            .collect()
    }
}

/// One component bound to a specific content set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInstance {
    pub component_type: ComponentType,
    pub content_set_id: u32,
    pub questions_per_instance: u32,
}

/// A single graded answer. Runner-specific fields ride along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub is_correct: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Answer {
    pub fn new(is_correct: bool) -> Self {
        Self {
            is_correct,
            extra: serde_json::Map::new(),
        }
    }
}

impl From<bool> for Answer {
    fn from(is_correct: bool) -> Self {
        Answer::new(is_correct)
    }
}

/// Answers produced by one component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentResult {
    pub component_type: ComponentType,
    pub content_set_id: u32,
    /// Declared number of questions for the instance.
    pub question_count: u32,
    #[serde(default)]
    pub answers: Vec<Answer>,
}

impl ComponentResult {
    pub fn new(instance: &ComponentInstance, answers: Vec<Answer>) -> Self {
        Self {
            component_type: instance.component_type,
            content_set_id: instance.content_set_id,
            question_count: instance.questions_per_instance,
            answers,
        }
    }

    /// Correctness per declared question slot: missing answers count as
    /// wrong, surplus answers are ignored.
    pub fn correctness(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.question_count as usize)
            .map(|i| self.answers.get(i).is_some_and(|a| a.is_correct))
    }

    pub fn correct_count(&self) -> u32 {
        self.correctness().filter(|&c| c).count() as u32
    }
}

/// Terminal output of one module run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResult {
    pub module_id: String,
    pub section_type: SectionType,
    pub total_questions: u32,
    #[serde(default)]
    pub component_results: Vec<ComponentResult>,
}

impl ModuleResult {
    pub fn empty(module: &GeneratedModule) -> Self {
        Self {
            module_id: module.module_id.clone(),
            section_type: module.section_type,
            total_questions: module.total_questions,
            component_results: Vec::new(),
        }
    }

    /// Flattened per-question correctness, in question-number order.
    pub fn question_results(&self) -> Vec<bool> {
        self.component_results
            .iter()
            .flat_map(|r| r.correctness())
            .collect()
    }
}
