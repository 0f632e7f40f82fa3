use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::spec::field::Field;
use crate::spec::rule::FieldRule;

/// Ordered group of fields, optionally gated by its own rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_if: Option<FieldRule>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.visible_if = Some(rule);
        self
    }
}

/// Top-level form document as persisted by the builder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Form {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            id: None,
            title: None,
            sections,
        }
    }

    /// Every field in document order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|section| section.fields.iter())
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().find(|field| field.name == name)
    }

    /// Section and field index of the field called `name`.
    pub fn locate_field(&self, name: &str) -> Option<(usize, usize)> {
        self.sections
            .iter()
            .enumerate()
            .find_map(|(section_idx, section)| {
                section
                    .fields
                    .iter()
                    .position(|field| field.name == name)
                    .map(|field_idx| (section_idx, field_idx))
            })
    }

    /// 1-based position of the field across the whole form.
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields()
            .position(|field| field.name == name)
            .map(|idx| idx + 1)
    }
}
