#![allow(missing_docs)]

pub mod condition;
pub mod debounce;
pub mod editor;
pub mod maintain;
pub mod scan;
pub mod spec;
pub mod validate;
pub mod visibility;

pub use condition::{Comparator, Condition, FieldValues, ValueFn, values_equal};
pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use editor::{Editor, PendingEdit, Selection};
pub use maintain::{
    CascadePolicy, EditError, FieldDeleteMode, OptionDeleteMode, RuleTarget, delete_field,
    delete_option, insert_field, move_field, rename_field, rename_option, retitle_field,
    set_option_text, set_rule,
};
pub use scan::{
    RuleOwner, RulePath, RuleRef, RuleStep, find_rules_referencing, owner_rule, rule_at,
    walk_rules,
};
pub use spec::{
    ANY_CHOICE, Field, FieldOption, FieldRule, FieldType, Form, Schedule, Section,
    field_name_for,
};
pub use validate::{CheckResult, IssueCode, RuleIssue, check};
pub use visibility::{
    FormVisibility, field_visible, is_visible, resolve_visibility, section_visible,
};
