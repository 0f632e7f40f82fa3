use std::fmt;

use serde::Serialize;

use crate::spec::{FieldRule, Form};

/// Section or field carrying a `visibleIf` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleOwner {
    Section { section: usize },
    Field { section: usize, field: usize },
}

impl fmt::Display for RuleOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleOwner::Section { section } => write!(f, "sections[{}]", section),
            RuleOwner::Field { section, field } => {
                write!(f, "sections[{}].fields[{}]", section, field)
            }
        }
    }
}

/// One hop from a node into its `and` or `or` group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "group", content = "index", rename_all = "snake_case")]
pub enum RuleStep {
    And(usize),
    Or(usize),
}

/// Location of a node inside an owner's rule tree; empty for the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RulePath(Vec<RuleStep>);

impl RulePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, step: RuleStep) -> Self {
        let mut steps = self.0.clone();
        steps.push(step);
        Self(steps)
    }

    pub fn steps(&self) -> &[RuleStep] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<RuleStep>> for RulePath {
    fn from(steps: Vec<RuleStep>) -> Self {
        Self(steps)
    }
}

impl fmt::Display for RulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("visibleIf")?;
        for step in &self.0 {
            match step {
                RuleStep::And(idx) => write!(f, ".and[{}]", idx)?,
                RuleStep::Or(idx) => write!(f, ".or[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// Borrowed rule node together with its address in the form.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleRef<'a> {
    pub owner: RuleOwner,
    pub path: RulePath,
    pub rule: &'a FieldRule,
}

/// Visits every rule node in document order: a section's own rule, then each
/// of its fields' rules; pre-order inside a tree with `and` before `or`.
pub fn walk_rules<'a, F>(form: &'a Form, visit: &mut F)
where
    F: FnMut(RuleOwner, &RulePath, &'a FieldRule),
{
    for (section_idx, section) in form.sections.iter().enumerate() {
        if let Some(rule) = &section.visible_if {
            let owner = RuleOwner::Section {
                section: section_idx,
            };
            walk_tree(owner, &RulePath::root(), rule, visit);
        }
        for (field_idx, field) in section.fields.iter().enumerate() {
            if let Some(rule) = &field.visible_if {
                let owner = RuleOwner::Field {
                    section: section_idx,
                    field: field_idx,
                };
                walk_tree(owner, &RulePath::root(), rule, visit);
            }
        }
    }
}

fn walk_tree<'a, F>(owner: RuleOwner, path: &RulePath, rule: &'a FieldRule, visit: &mut F)
where
    F: FnMut(RuleOwner, &RulePath, &'a FieldRule),
{
    visit(owner, path, rule);
    for (idx, child) in rule.and.iter().enumerate() {
        walk_tree(owner, &path.child(RuleStep::And(idx)), child, visit);
    }
    for (idx, child) in rule.or.iter().enumerate() {
        walk_tree(owner, &path.child(RuleStep::Or(idx)), child, visit);
    }
}

/// Every rule node reading `field`, optionally restricted to nodes comparing
/// it against `option`.
pub fn find_rules_referencing<'a>(
    form: &'a Form,
    field: &str,
    option: Option<&str>,
) -> Vec<RuleRef<'a>> {
    let mut found = Vec::new();
    walk_rules(form, &mut |owner, path, rule| {
        if rule.references(field, option) {
            found.push(RuleRef {
                owner,
                path: path.clone(),
                rule,
            });
        }
    });
    found
}

/// Root rule of `owner`, if the owner still exists and carries one.
pub fn owner_rule(form: &Form, owner: RuleOwner) -> Option<&FieldRule> {
    match owner {
        RuleOwner::Section { section } => form.sections.get(section)?.visible_if.as_ref(),
        RuleOwner::Field { section, field } => form
            .sections
            .get(section)?
            .fields
            .get(field)?
            .visible_if
            .as_ref(),
    }
}

/// Resolves an address produced by the scanner against `form`. Every index is
/// re-checked, so stale addresses yield `None`.
pub fn rule_at<'a>(form: &'a Form, owner: RuleOwner, path: &RulePath) -> Option<&'a FieldRule> {
    path.steps()
        .iter()
        .try_fold(owner_rule(form, owner)?, |node, step| match step {
            RuleStep::And(idx) => node.and.get(*idx),
            RuleStep::Or(idx) => node.or.get(*idx),
        })
}
