use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::scan::{RuleOwner, RulePath, walk_rules};
use crate::spec::{ANY_CHOICE, FieldRule, Form};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    DuplicateField,
    DuplicateOption,
    UnknownField,
    UnknownOption,
    SelfReference,
}

/// Structural problem found in a form. Editing never rejects these; the
/// evaluator treats dangling references as not visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleIssue {
    pub code: IssueCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<RuleOwner>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<RulePath>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub issues: Vec<RuleIssue>,
}

pub fn check(form: &Form) -> CheckResult {
    let mut issues = Vec::new();
    duplicate_names(form, &mut issues);

    walk_rules(form, &mut |owner, path, rule| {
        let Some(name) = rule.field.as_deref() else {
            return;
        };

        if let RuleOwner::Field { section, field } = owner
            && form.sections[section].fields[field].name == name
        {
            issues.push(rule_issue(
                IssueCode::SelfReference,
                owner,
                path,
                format!("field '{}' depends on its own value", name),
            ));
        }

        let Some(target) = form.field(name) else {
            issues.push(rule_issue(
                IssueCode::UnknownField,
                owner,
                path,
                format!("rule references unknown field '{}'", name),
            ));
            return;
        };

        if !target.kind.is_choice() || target.options.is_empty() {
            return;
        }
        for value in compared_options(rule) {
            if target.option(value).is_none() {
                issues.push(rule_issue(
                    IssueCode::UnknownOption,
                    owner,
                    path,
                    format!("field '{}' has no option '{}'", name, value),
                ));
            }
        }
    });

    CheckResult {
        valid: issues.is_empty(),
        issues,
    }
}

fn duplicate_names(form: &Form, issues: &mut Vec<RuleIssue>) {
    let mut seen = BTreeSet::new();
    for (section_idx, section) in form.sections.iter().enumerate() {
        for (field_idx, field) in section.fields.iter().enumerate() {
            let owner = RuleOwner::Field {
                section: section_idx,
                field: field_idx,
            };
            if !seen.insert(field.name.as_str()) {
                issues.push(RuleIssue {
                    code: IssueCode::DuplicateField,
                    owner: Some(owner),
                    path: None,
                    message: format!("duplicate field name '{}'", field.name),
                });
            }

            let mut options = BTreeSet::new();
            for option in &field.options {
                if !options.insert(option.name.as_str()) {
                    issues.push(RuleIssue {
                        code: IssueCode::DuplicateOption,
                        owner: Some(owner),
                        path: None,
                        message: format!(
                            "duplicate option '{}' on field '{}'",
                            option.name, field.name
                        ),
                    });
                }
            }
        }
    }
}

fn compared_options(rule: &FieldRule) -> impl Iterator<Item = &str> {
    [rule.equals.as_ref(), rule.not_equals.as_ref()]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|value| *value != ANY_CHOICE)
}

fn rule_issue(code: IssueCode, owner: RuleOwner, path: &RulePath, message: String) -> RuleIssue {
    RuleIssue {
        code,
        owner: Some(owner),
        path: Some(path.clone()),
        message,
    }
}
