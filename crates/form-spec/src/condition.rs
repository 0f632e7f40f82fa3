use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::spec::rule::{ANY_CHOICE, FieldRule};

/// Read access to the current answers, keyed by field name.
pub trait FieldValues {
    fn field_value(&self, name: &str) -> Option<Value>;
}

impl FieldValues for Value {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl FieldValues for Map<String, Value> {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl FieldValues for BTreeMap<String, Value> {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl FieldValues for HashMap<String, Value> {
    fn field_value(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<T: FieldValues + ?Sized> FieldValues for &T {
    fn field_value(&self, name: &str) -> Option<Value> {
        (**self).field_value(name)
    }
}

/// Adapts a `getValue`-style closure supplied by a host.
pub struct ValueFn<F>(pub F);

impl<F> FieldValues for ValueFn<F>
where
    F: Fn(&str) -> Option<Value>,
{
    fn field_value(&self, name: &str) -> Option<Value> {
        (self.0)(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Equals,
    NotEquals,
}

/// Evaluated form of a [`FieldRule`].
///
/// A wire node lowers to `All[and.., Any[leaf.., or..]]`: every `and` child
/// vetoes, the leaf or any `or` child may then satisfy the node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Always,
    Leaf {
        field: String,
        comparator: Comparator,
        value: Value,
    },
    All {
        children: Vec<Condition>,
    },
    Any {
        children: Vec<Condition>,
    },
}

impl Condition {
    pub fn from_rule(rule: &FieldRule) -> Condition {
        if rule.is_vacuous() {
            return Condition::Always;
        }

        let mut rescue = Vec::new();
        if let Some(field) = &rule.field {
            if let Some(value) = &rule.equals {
                rescue.push(Condition::Leaf {
                    field: field.clone(),
                    comparator: Comparator::Equals,
                    value: value.clone(),
                });
            }
            if let Some(value) = &rule.not_equals {
                rescue.push(Condition::Leaf {
                    field: field.clone(),
                    comparator: Comparator::NotEquals,
                    value: value.clone(),
                });
            }
        }
        rescue.extend(rule.or.iter().map(Condition::from_rule));

        let mut veto = rule
            .and
            .iter()
            .map(Condition::from_rule)
            .collect::<Vec<_>>();
        // An empty rescue group is false: without a leaf, `and` children alone
        // can only veto.
        veto.push(collapse(rescue, |children| Condition::Any { children }));
        collapse(veto, |children| Condition::All { children })
    }

    /// Evaluates against the current answers. Never fails: a missing value
    /// fails every comparison.
    pub fn evaluate<V: FieldValues + ?Sized>(&self, values: &V) -> bool {
        match self {
            Condition::Always => true,
            Condition::Leaf {
                field,
                comparator,
                value,
            } => leaf_matches(values.field_value(field), *comparator, value),
            Condition::All { children } => children.iter().all(|child| child.evaluate(values)),
            Condition::Any { children } => children.iter().any(|child| child.evaluate(values)),
        }
    }
}

fn collapse(mut children: Vec<Condition>, wrap: fn(Vec<Condition>) -> Condition) -> Condition {
    if children.len() == 1
        && let Some(only) = children.pop()
    {
        return only;
    }
    wrap(children)
}

impl FieldRule {
    pub fn condition(&self) -> Condition {
        Condition::from_rule(self)
    }

    pub fn evaluate<V: FieldValues + ?Sized>(&self, values: &V) -> bool {
        self.condition().evaluate(values)
    }
}

fn leaf_matches(actual: Option<Value>, comparator: Comparator, expected: &Value) -> bool {
    let Some(actual) = actual.filter(|value| !value.is_null()) else {
        return false;
    };
    let matched = if expected.as_str() == Some(ANY_CHOICE) {
        has_choice(&actual)
    } else {
        values_equal(&actual, expected)
    };
    match comparator {
        Comparator::Equals => matched,
        Comparator::NotEquals => !matched,
    }
}

fn has_choice(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(_) => true,
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Equality with numeric coercion between numbers and numeric strings.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(number), Value::String(text))
        | (Value::String(text), Value::Number(number)) => {
            match (number.as_f64(), text.trim().parse::<f64>()) {
                (Some(number), Ok(parsed)) => number == parsed,
                _ => false,
            }
        }
        (Value::Number(left), Value::Number(right)) => match (left.as_f64(), right.as_f64()) {
            (Some(left), Some(right)) => left == right,
            _ => left == right,
        },
        _ => left == right,
    }
}
