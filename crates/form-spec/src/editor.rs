//! Single editing session over a form document.
//!
//! The session is the only mutator. Every commit swaps in a fresh
//! `Arc<Form>`, so a renderer holding a previous snapshot keeps reading a
//! complete, unchanged form.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::debounce::Debouncer;
use crate::maintain::{self, CascadePolicy, EditError, RuleTarget};
use crate::spec::{Field, FieldRule, Form, Section};

/// Text-driven edit waiting for its debounce delay.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingEdit {
    Rule {
        target: RuleTarget,
        rule: Option<FieldRule>,
    },
    OptionText {
        field: String,
        option: String,
        text: String,
    },
}

/// Current section/field in the builder. Stored by index and name, and
/// re-validated against the current form on every read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub section: Option<usize>,
    pub field: Option<String>,
}

pub struct Editor {
    form: Arc<Form>,
    selection: Selection,
    pending: Debouncer<PendingEdit>,
    policy: CascadePolicy,
    revision: u64,
}

impl Editor {
    pub fn new(form: Form) -> Self {
        Self {
            form: Arc::new(form),
            selection: Selection::default(),
            pending: Debouncer::default(),
            policy: CascadePolicy::default(),
            revision: 0,
        }
    }

    pub fn with_policy(mut self, policy: CascadePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.pending = Debouncer::new(delay);
        self
    }

    /// Snapshot of the committed form.
    pub fn form(&self) -> Arc<Form> {
        Arc::clone(&self.form)
    }

    /// Number of commits so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn policy(&self) -> &CascadePolicy {
        &self.policy
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn select_section(&mut self, index: usize) -> bool {
        if index >= self.form.sections.len() {
            return false;
        }
        self.selection.section = Some(index);
        true
    }

    pub fn select_field(&mut self, name: &str) -> bool {
        let Some((section, _)) = self.form.locate_field(name) else {
            return false;
        };
        self.selection = Selection {
            section: Some(section),
            field: Some(name.to_string()),
        };
        true
    }

    pub fn selected_section(&self) -> Option<&Section> {
        self.form.sections.get(self.selection.section?)
    }

    pub fn selected_field(&self) -> Option<&Field> {
        self.form.field(self.selection.field.as_deref()?)
    }

    /// Stages a rule edit; it commits once the debounce delay has passed
    /// without a newer edit.
    pub fn stage_rule(&mut self, target: RuleTarget, rule: Option<FieldRule>, now: Instant) {
        self.stage(PendingEdit::Rule { target, rule }, now);
    }

    pub fn stage_option_text(&mut self, field: &str, option: &str, text: &str, now: Instant) {
        self.stage(
            PendingEdit::OptionText {
                field: field.to_string(),
                option: option.to_string(),
                text: text.to_string(),
            },
            now,
        );
    }

    fn stage(&mut self, edit: PendingEdit, now: Instant) {
        if let Some(replaced) = self.pending.schedule(edit, now) {
            trace!(?replaced, "superseded pending edit");
        }
    }

    /// Commits the pending edit if it is due. Returns whether a commit
    /// happened.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending.poll(now) {
            Some(edit) => self.apply_pending(edit),
            None => false,
        }
    }

    /// Commits the pending edit immediately.
    pub fn flush(&mut self) -> bool {
        match self.pending.flush() {
            Some(edit) => self.apply_pending(edit),
            None => false,
        }
    }

    fn apply_pending(&mut self, edit: PendingEdit) -> bool {
        let result = match &edit {
            PendingEdit::Rule { target, rule } => {
                maintain::set_rule(&self.form, target, rule.clone())
            }
            PendingEdit::OptionText {
                field,
                option,
                text,
            } => maintain::set_option_text(&self.form, field, option, text),
        };
        self.commit_result(result, "pending edit")
    }

    /// Enables or disables the conditional switch of a target. Enabling
    /// attaches an empty rule; disabling drops the rule.
    pub fn set_conditional(&mut self, target: RuleTarget, enabled: bool) -> bool {
        self.structural("set conditional", |form, _| {
            maintain::set_rule(form, &target, enabled.then(FieldRule::default))
        })
    }

    pub fn rename_field(&mut self, old: &str, new: &str) -> bool {
        let selected = self.selection.field.as_deref() == Some(old);
        let renamed = self.structural("rename field", |form, _| {
            maintain::rename_field(form, old, new)
        });
        if renamed && selected {
            self.selection.field = Some(new.to_string());
        }
        renamed
    }

    /// Changes a field's title; the derived name and every rule follow.
    pub fn retitle_field(&mut self, name: &str, title: &str) -> bool {
        let selected = self.selection.field.as_deref() == Some(name);
        let position = self.form.field_position(name);
        let retitled = self.structural("retitle field", |form, _| {
            maintain::retitle_field(form, name, title)
        });
        if retitled
            && selected
            && let Some(position) = position
        {
            self.selection.field = Some(crate::spec::field_name_for(title, position));
        }
        retitled
    }

    pub fn rename_option(&mut self, field: &str, old: &str, new: &str) -> bool {
        self.structural("rename option", |form, _| {
            maintain::rename_option(form, field, old, new)
        })
    }

    pub fn delete_field(&mut self, name: &str) -> bool {
        if self.form.field(name).is_none() {
            debug!(field = name, "delete skipped, field not found");
            return false;
        }
        self.structural("delete field", |form, policy| {
            Ok(maintain::delete_field(form, name, policy))
        })
    }

    pub fn delete_option(&mut self, field: &str, option: &str) -> bool {
        let exists = self
            .form
            .field(field)
            .is_some_and(|owner| owner.option(option).is_some());
        if !exists {
            debug!(field, option, "delete skipped, option not found");
            return false;
        }
        self.structural("delete option", |form, policy| {
            Ok(maintain::delete_option(form, field, option, policy))
        })
    }

    pub fn insert_field(&mut self, section: usize, index: usize, field: Field) -> bool {
        self.structural("insert field", |form, _| {
            maintain::insert_field(form, section, index, field)
        })
    }

    pub fn move_field(&mut self, name: &str, section: usize, index: usize) -> bool {
        let moved = self.structural("move field", |form, _| {
            maintain::move_field(form, name, section, index)
        });
        if moved && self.selection.field.as_deref() == Some(name) {
            self.selection.section = Some(section);
        }
        moved
    }

    /// Runs a schema edit. A pending debounced edit is cancelled first: it
    /// was written against names the structural edit may have changed.
    fn structural(
        &mut self,
        action: &'static str,
        op: impl FnOnce(&Form, &CascadePolicy) -> Result<Form, EditError>,
    ) -> bool {
        if let Some(dropped) = self.pending.cancel() {
            debug!(action, ?dropped, "cancelled pending edit before structural change");
        }
        let result = op(self.form.as_ref(), &self.policy);
        self.commit_result(result, action)
    }

    fn commit_result(&mut self, result: Result<Form, EditError>, action: &'static str) -> bool {
        match result {
            Ok(form) => {
                self.form = Arc::new(form);
                self.revision += 1;
                self.revalidate_selection();
                debug!(action, revision = self.revision, "committed form");
                true
            }
            Err(error) => {
                debug!(action, %error, "edit skipped");
                false
            }
        }
    }

    fn revalidate_selection(&mut self) {
        if self
            .selection
            .section
            .is_some_and(|index| index >= self.form.sections.len())
        {
            self.selection.section = None;
        }
        if let Some(name) = self.selection.field.as_deref()
            && self.form.field(name).is_none()
        {
            self.selection.field = None;
        }
    }
}
