//! Module definition registry.
//!
//! Maps `(section, module number)` to an ordered list of component
//! instances. Each slot of a section's structure owns an independent
//! content-set id series, so ids for one type never repeat or skip across
//! modules.

use crate::error::RegistryError;
use crate::model::{
    ComponentInstance, ComponentSlot, ComponentType, GeneratedModule, IdPolicy,
    SectionDefinition, SectionType,
};

const READING_STRUCTURE: &[ComponentSlot] = &[
    ComponentSlot::per_repeat(ComponentType::CompleteTheWords, 2, 10),
    ComponentSlot::per_repeat(ComponentType::DailyLifeShort, 2, 2),
    ComponentSlot::per_repeat(ComponentType::DailyLifeLong, 2, 3),
    ComponentSlot::module_keyed(ComponentType::AcademicPassage, 5),
];

const LISTENING_STRUCTURE: &[ComponentSlot] = &[
    ComponentSlot::per_repeat(ComponentType::ChooseResponse, 10, 1),
    ComponentSlot::per_repeat(ComponentType::Conversation, 3, 2),
    ComponentSlot::per_repeat(ComponentType::Announcement, 2, 2),
    ComponentSlot::per_repeat(ComponentType::AcademicTalk, 2, 5),
];

const WRITING_STRUCTURE: &[ComponentSlot] = &[
    ComponentSlot::per_repeat(ComponentType::BuildSentence, 1, 10),
    ComponentSlot::module_keyed(ComponentType::Email, 1),
    ComponentSlot::module_keyed(ComponentType::AcademicDiscussion, 1),
];

const SPEAKING_STRUCTURE: &[ComponentSlot] = &[
    ComponentSlot::per_repeat(ComponentType::ListenRepeat, 1, 7),
    ComponentSlot::per_repeat(ComponentType::Interview, 1, 4),
];

static READING: SectionDefinition = SectionDefinition {
    section: SectionType::Reading,
    total_questions: 35,
    time_limit_secs: Some(1800),
    component_structure: READING_STRUCTURE,
};

static LISTENING: SectionDefinition = SectionDefinition {
    section: SectionType::Listening,
    total_questions: 30,
    time_limit_secs: None,
    component_structure: LISTENING_STRUCTURE,
};

static WRITING: SectionDefinition = SectionDefinition {
    section: SectionType::Writing,
    total_questions: 12,
    time_limit_secs: Some(1380),
    component_structure: WRITING_STRUCTURE,
};

static SPEAKING: SectionDefinition = SectionDefinition {
    section: SectionType::Speaking,
    total_questions: 11,
    time_limit_secs: None,
    component_structure: SPEAKING_STRUCTURE,
};

/// The built-in definition for a section.
pub fn section_definition(section: SectionType) -> &'static SectionDefinition {
    match section {
        SectionType::Reading => &READING,
        SectionType::Listening => &LISTENING,
        SectionType::Writing => &WRITING,
        SectionType::Speaking => &SPEAKING,
    }
}

impl SectionDefinition {
    /// Check the structural invariants of this definition.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidDefinition {
            section: self.section,
            reason,
        };

        let sum: u32 = self
            .component_structure
            .iter()
            .map(|s| s.repeat_count * s.questions_per_instance)
            .sum();
        if sum != self.total_questions {
            return Err(invalid(format!(
                "component questions sum to {sum}, expected {}",
                self.total_questions
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for slot in self.component_structure {
            if slot.component_type.section() != self.section {
                return Err(invalid(format!(
                    "'{}' belongs to {}",
                    slot.component_type,
                    slot.component_type.section()
                )));
            }
            if !seen.insert(slot.component_type) {
                return Err(invalid(format!(
                    "'{}' appears in more than one slot",
                    slot.component_type
                )));
            }
            if slot.repeat_count == 0 || slot.questions_per_instance == 0 {
                return Err(invalid(format!("'{}' has an empty slot", slot.component_type)));
            }
            if slot.id_policy == IdPolicy::ModuleKeyed && slot.repeat_count != 1 {
                return Err(invalid(format!(
                    "'{}' is module-keyed but repeats {} times",
                    slot.component_type, slot.repeat_count
                )));
            }
        }

        Ok(())
    }

    /// Generate the module with the given number from this definition.
    pub fn generate(&self, module_number: u32) -> Result<GeneratedModule, RegistryError> {
        if module_number == 0 {
            return Err(RegistryError::InvalidModuleNumber(module_number));
        }

        let out_of_range = || RegistryError::ModuleNumberOutOfRange {
            section: self.section,
            module_number,
        };

        let mut components = Vec::new();
        for slot in self.component_structure {
            // The last id of the slot must fit too.
            let first_id = (module_number - 1)
                .checked_mul(slot.stride())
                .and_then(|offset| offset.checked_add(slot.id_base))
                .filter(|first| first.checked_add(slot.repeat_count.saturating_sub(1)).is_some())
                .ok_or_else(out_of_range)?;
            for k in 0..slot.repeat_count {
                components.push(ComponentInstance {
                    component_type: slot.component_type,
                    content_set_id: first_id + k,
                    questions_per_instance: slot.questions_per_instance,
                });
            }
        }

        Ok(GeneratedModule {
            module_id: format!("{}_module_{module_number}", self.section),
            module_name: format!("{} Module {module_number}", self.section.title()),
            section_type: self.section,
            module_number,
            total_questions: self.total_questions,
            time_limit_secs: self.time_limit_secs,
            components,
        })
    }
}

/// Generate a module for a known section.
pub fn generate_module(
    section: SectionType,
    module_number: u32,
) -> Result<GeneratedModule, RegistryError> {
    section_definition(section).generate(module_number)
}

/// Look up a module by section name.
///
/// Returns `None` for an unknown section or module number 0; callers treat
/// that as "cannot start session".
pub fn get_module(section: &str, module_number: u32) -> Option<GeneratedModule> {
    let section_type = match section.parse::<SectionType>() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("module lookup failed: {e}");
            return None;
        }
    };

    match generate_module(section_type, module_number) {
        Ok(module) => Some(module),
        Err(e) => {
            tracing::warn!("module lookup failed for {section_type}: {e}");
            None
        }
    }
}

/// Split a module id like `reading_module_3` into its section and number.
pub fn parse_module_id(module_id: &str) -> Option<(SectionType, u32)> {
    let (section, number) = module_id.split_once("_module_")?;
    let section = section.parse::<SectionType>().ok()?;
    let number = number.parse::<u32>().ok().filter(|&n| n > 0)?;
    Some((section, number))
}
