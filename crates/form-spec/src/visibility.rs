use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::condition::FieldValues;
use crate::spec::{Field, FieldRule, Form, Section};

/// Decides whether an optional rule lets its owner show. No rule means visible.
pub fn is_visible<V: FieldValues + ?Sized>(rule: Option<&FieldRule>, values: &V) -> bool {
    rule.is_none_or(|rule| rule.evaluate(values))
}

pub fn section_visible<V: FieldValues + ?Sized>(section: &Section, values: &V) -> bool {
    is_visible(section.visible_if.as_ref(), values)
}

/// Rule visibility ANDed with the field's schedule window at `now`.
pub fn field_visible<V: FieldValues + ?Sized>(
    field: &Field,
    values: &V,
    now: DateTime<Utc>,
) -> bool {
    is_visible(field.visible_if.as_ref(), values)
        && field
            .schedule
            .as_ref()
            .is_none_or(|schedule| schedule.is_open(now))
}

/// Visibility of every section (by index) and field (by name) for one render.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormVisibility {
    pub sections: Vec<bool>,
    pub fields: BTreeMap<String, bool>,
}

impl FormVisibility {
    pub fn section(&self, index: usize) -> bool {
        self.sections.get(index).copied().unwrap_or(false)
    }

    pub fn field(&self, name: &str) -> bool {
        self.fields.get(name).copied().unwrap_or(false)
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, visible)| **visible)
            .map(|(name, _)| name.as_str())
    }
}

/// Evaluates every section and field against one answer snapshot. Fields of a
/// hidden section are hidden.
pub fn resolve_visibility<V: FieldValues + ?Sized>(
    form: &Form,
    values: &V,
    now: DateTime<Utc>,
) -> FormVisibility {
    let mut visibility = FormVisibility::default();

    for section in &form.sections {
        let shown = section_visible(section, values);
        visibility.sections.push(shown);
        for field in &section.fields {
            visibility
                .fields
                .insert(field.name.clone(), shown && field_visible(field, values, now));
        }
    }

    visibility
}
