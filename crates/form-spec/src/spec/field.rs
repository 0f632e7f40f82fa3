use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::rule::FieldRule;
use crate::spec::schedule::Schedule;

/// Supported field widgets. Unknown types load as [`FieldType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    #[default]
    Text,
    Select,
    Radio,
    Checklist,
    Table,
    Slider,
    Number,
    Date,
    DateTime,
    Boolean,
    Html,
    Submit,
    Files,
    #[serde(other)]
    Other,
}

impl FieldType {
    /// Types whose answers are option names.
    pub fn is_choice(self) -> bool {
        matches!(self, FieldType::Select | FieldType::Radio | FieldType::Checklist)
    }
}

/// One selectable option of a choice field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOption {
    pub name: String,
    #[serde(default)]
    pub text: String,
}

impl FieldOption {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// A typed input inside a section.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: FieldType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<FieldRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.visible_if = Some(rule);
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn option(&self, name: &str) -> Option<&FieldOption> {
        self.options.iter().find(|option| option.name == name)
    }
}

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\p{Alphabetic}\p{N}]+")
        .unwrap_or_else(|error| panic!("invalid slug pattern: {error}"))
});

/// Derives a field name from its title and 1-based position in the form.
///
/// `field_name_for("Your age?", 3)` yields `your_age_3`. Letters outside
/// ASCII are kept, so `Ikä?` becomes `ikä_1`.
pub fn field_name_for(title: &str, position: usize) -> String {
    let lowered = title.to_lowercase();
    let slug = NON_WORD.replace_all(&lowered, "_");
    let slug = slug.trim_matches('_');
    let base = if slug.is_empty() { "field" } else { slug };
    format!("{}_{}", base, position)
}
