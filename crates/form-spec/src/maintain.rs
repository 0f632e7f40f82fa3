//! Copy-on-write schema edits that keep every `visibleIf` rule consistent.
//!
//! Each operation borrows the current [`Form`] and returns a new one; the
//! input is never touched, so readers holding the old value see no partial
//! edit.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::scan::find_rules_referencing;
use crate::spec::{Field, FieldRule, Form, Section, field_name_for};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("section {0} does not exist")]
    UnknownSection(usize),
    #[error("field '{0}' does not exist")]
    UnknownField(String),
    #[error("option '{option}' does not exist on field '{field}'")]
    UnknownOption { field: String, option: String },
    #[error("field name '{0}' is already in use")]
    DuplicateField(String),
    #[error("option '{option}' already exists on field '{field}'")]
    DuplicateOption { field: String, option: String },
}

/// How deleting a field repairs rules that read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldDeleteMode {
    /// Clear an owner's rule only when its root node reads the field.
    #[default]
    Shallow,
    /// Shallow clearing, plus removal of nested `and`/`or` nodes reading it.
    Prune,
}

/// How deleting an option repairs rules that compare against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OptionDeleteMode {
    /// Leave rules untouched; the editor reassigns them.
    #[default]
    Keep,
    /// Clear every owner whose rule tree names the option anywhere.
    ClearOwner,
}

/// Cascade behaviour for structural deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub struct CascadePolicy {
    #[serde(default)]
    pub field_delete: FieldDeleteMode,
    #[serde(default)]
    pub option_delete: OptionDeleteMode,
}

/// Addresses the rule a property editor writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleTarget {
    Section { index: usize },
    Field { name: String },
}

/// Renames a field and every rule node reading it, at any depth.
///
/// `equals`/`notEquals` are option identifiers and stay as they are. When the
/// schema already carries `new` (and no longer `old`) only the rules are
/// repaired.
pub fn rename_field(form: &Form, old: &str, new: &str) -> Result<Form, EditError> {
    if old == new {
        return Ok(form.clone());
    }
    if form.field(old).is_some() && form.field(new).is_some() {
        return Err(EditError::DuplicateField(new.to_string()));
    }

    let references = find_rules_referencing(form, old, None).len();
    let renamed = rebuild(
        form,
        |field| {
            Some(if field.name == old {
                Field {
                    name: new.to_string(),
                    ..field.clone()
                }
            } else {
                field.clone()
            })
        },
        |rule| {
            Some(rule.map_nodes(&|node| {
                let mut head = node.head();
                if head.field.as_deref() == Some(old) {
                    head.field = Some(new.to_string());
                }
                head
            }))
        },
    );
    debug!(old, new, references, "renamed field references");
    Ok(renamed)
}

/// Renames an option of `field` and every `equals`/`notEquals` naming it on
/// nodes that read `field`, at any depth.
pub fn rename_option(form: &Form, field: &str, old: &str, new: &str) -> Result<Form, EditError> {
    let owner = form
        .field(field)
        .ok_or_else(|| EditError::UnknownField(field.to_string()))?;
    if old == new {
        return Ok(form.clone());
    }
    if owner.option(new).is_some() {
        return Err(EditError::DuplicateOption {
            field: field.to_string(),
            option: new.to_string(),
        });
    }

    let references = find_rules_referencing(form, field, Some(old)).len();
    let renamed = rebuild(
        form,
        |candidate| {
            let mut next = candidate.clone();
            if next.name == field {
                for option in next.options.iter_mut().filter(|option| option.name == old) {
                    option.name = new.to_string();
                }
            }
            Some(next)
        },
        |rule| {
            Some(rule.map_nodes(&|node| {
                let mut head = node.head();
                if head.field.as_deref() == Some(field) {
                    head.equals = rename_value(head.equals, old, new);
                    head.not_equals = rename_value(head.not_equals, old, new);
                }
                head
            }))
        },
    );
    debug!(field, old, new, references, "renamed option references");
    Ok(renamed)
}

fn rename_value(value: Option<Value>, old: &str, new: &str) -> Option<Value> {
    match value {
        Some(Value::String(text)) if text == old => Some(Value::String(new.to_string())),
        other => other,
    }
}

/// Removes a field and clears rules that can no longer be evaluated.
///
/// Owners whose root node reads `name` lose their whole rule. With
/// [`FieldDeleteMode::Prune`] nested nodes reading `name` are also dropped
/// from the remaining rules.
pub fn delete_field(form: &Form, name: &str, policy: &CascadePolicy) -> Form {
    let prune = policy.field_delete == FieldDeleteMode::Prune;
    let cleared = count_owners(form, |rule| rule.field.as_deref() == Some(name));
    let keep = |node: &FieldRule| node.field.as_deref() != Some(name);

    let next = rebuild(
        form,
        |field| (field.name != name).then(|| field.clone()),
        |rule| {
            if rule.field.as_deref() == Some(name) {
                None
            } else if prune {
                Some(rule.retain_nodes(&keep))
            } else {
                Some(rule.clone())
            }
        },
    );
    debug!(field = name, cleared, mode = ?policy.field_delete, "deleted field");
    next
}

/// Removes an option from `field`. Rules are cleared only under
/// [`OptionDeleteMode::ClearOwner`].
pub fn delete_option(form: &Form, field: &str, option: &str, policy: &CascadePolicy) -> Form {
    let clear = policy.option_delete == OptionDeleteMode::ClearOwner;
    let names_option = |node: &FieldRule| node.references(field, Some(option));
    let affected = count_owners(form, |rule| rule.any_node(&names_option));

    let next = rebuild(
        form,
        |candidate| {
            let mut next = candidate.clone();
            if next.name == field {
                next.options.retain(|existing| existing.name != option);
            }
            Some(next)
        },
        |rule| {
            if clear && rule.any_node(&names_option) {
                None
            } else {
                Some(rule.clone())
            }
        },
    );
    debug!(field, option, affected, cleared = clear, "deleted option");
    next
}

/// Changes a field's title and re-derives its name from title and position,
/// cascading the rename into every rule.
pub fn retitle_field(form: &Form, name: &str, title: &str) -> Result<Form, EditError> {
    let position = form
        .field_position(name)
        .ok_or_else(|| EditError::UnknownField(name.to_string()))?;
    let derived = field_name_for(title, position);

    let retitled = rebuild(
        form,
        |field| {
            Some(if field.name == name {
                Field {
                    title: title.to_string(),
                    ..field.clone()
                }
            } else {
                field.clone()
            })
        },
        |rule| Some(rule.clone()),
    );
    rename_field(&retitled, name, &derived)
}

/// Adds a field at `index` (clamped) in `section`.
pub fn insert_field(
    form: &Form,
    section: usize,
    index: usize,
    field: Field,
) -> Result<Form, EditError> {
    if form.field(&field.name).is_some() {
        return Err(EditError::DuplicateField(field.name));
    }
    let mut next = form.clone();
    let target = next
        .sections
        .get_mut(section)
        .ok_or(EditError::UnknownSection(section))?;
    let index = index.min(target.fields.len());
    target.fields.insert(index, field);
    Ok(next)
}

/// Moves a field to `index` (clamped) in `section`. Names are stable, so rules
/// need no repair.
pub fn move_field(
    form: &Form,
    name: &str,
    section: usize,
    index: usize,
) -> Result<Form, EditError> {
    let (from_section, from_idx) = form
        .locate_field(name)
        .ok_or_else(|| EditError::UnknownField(name.to_string()))?;
    if section >= form.sections.len() {
        return Err(EditError::UnknownSection(section));
    }

    let mut next = form.clone();
    let field = next.sections[from_section].fields.remove(from_idx);
    let target = &mut next.sections[section].fields;
    let index = index.min(target.len());
    target.insert(index, field);
    Ok(next)
}

/// Replaces (or with `None`, removes) the rule of a section or field.
pub fn set_rule(
    form: &Form,
    target: &RuleTarget,
    rule: Option<FieldRule>,
) -> Result<Form, EditError> {
    let mut next = form.clone();
    match target {
        RuleTarget::Section { index } => {
            next.sections
                .get_mut(*index)
                .ok_or(EditError::UnknownSection(*index))?
                .visible_if = rule;
        }
        RuleTarget::Field { name } => {
            let (section, field) = form
                .locate_field(name)
                .ok_or_else(|| EditError::UnknownField(name.clone()))?;
            next.sections[section].fields[field].visible_if = rule;
        }
    }
    Ok(next)
}

/// Updates the display text of an option. Rules key on option names, so no
/// cascade is needed.
pub fn set_option_text(
    form: &Form,
    field: &str,
    option: &str,
    text: &str,
) -> Result<Form, EditError> {
    let (section, field_idx) = form
        .locate_field(field)
        .ok_or_else(|| EditError::UnknownField(field.to_string()))?;
    let mut next = form.clone();
    let target = next.sections[section].fields[field_idx]
        .options
        .iter_mut()
        .find(|existing| existing.name == option)
        .ok_or_else(|| EditError::UnknownOption {
            field: field.to_string(),
            option: option.to_string(),
        })?;
    target.text = text.to_string();
    Ok(next)
}

fn count_owners(form: &Form, matches: impl Fn(&FieldRule) -> bool) -> usize {
    form.sections
        .iter()
        .flat_map(|section| {
            std::iter::once(section.visible_if.as_ref())
                .chain(section.fields.iter().map(|field| field.visible_if.as_ref()))
        })
        .flatten()
        .filter(|rule| matches(rule))
        .count()
}

/// Builds a new form by passing every field through `field_fn` (dropping it on
/// `None`) and every owner rule through `rule_fn` (clearing it on `None`).
fn rebuild(
    form: &Form,
    field_fn: impl Fn(&Field) -> Option<Field>,
    rule_fn: impl Fn(&FieldRule) -> Option<FieldRule>,
) -> Form {
    let sections = form
        .sections
        .iter()
        .map(|section| Section {
            title: section.title.clone(),
            visible_if: section.visible_if.as_ref().and_then(&rule_fn),
            fields: section
                .fields
                .iter()
                .filter_map(&field_fn)
                .map(|field| {
                    let visible_if = field.visible_if.as_ref().and_then(&rule_fn);
                    Field { visible_if, ..field }
                })
                .collect(),
        })
        .collect();

    Form {
        id: form.id.clone(),
        title: form.title.clone(),
        sections,
    }
}
