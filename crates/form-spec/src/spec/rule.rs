use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sentinel accepted in `equals`/`notEquals` meaning "any non-empty choice".
pub const ANY_CHOICE: &str = "true";

/// Persisted visibility predicate attached to a section or field as `visibleIf`.
///
/// Every key is optional on the wire. A node carries its own leaf condition
/// (`field` compared through `equals`/`notEquals`) and two child groups: every
/// `and` child must hold, and any `or` child may rescue a failed leaf. See
/// [`crate::condition::Condition`] for the evaluated form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_equals: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub and: Vec<FieldRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or: Vec<FieldRule>,
}

impl FieldRule {
    /// Leaf matching when `field` equals `value`.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: Some(field.into()),
            equals: Some(value.into()),
            ..Self::default()
        }
    }

    /// Leaf matching when `field` differs from `value`.
    pub fn not_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: Some(field.into()),
            not_equals: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_and(mut self, rule: FieldRule) -> Self {
        self.and.push(rule);
        self
    }

    pub fn with_or(mut self, rule: FieldRule) -> Self {
        self.or.push(rule);
        self
    }

    /// True when the node compares a field against a value.
    pub fn has_leaf(&self) -> bool {
        self.field.is_some() && (self.equals.is_some() || self.not_equals.is_some())
    }

    /// A node naming no field and carrying no children constrains nothing.
    /// A node that names a field but has no comparison yet is not vacuous:
    /// its leaf is false.
    pub fn is_vacuous(&self) -> bool {
        self.field.is_none() && self.and.is_empty() && self.or.is_empty()
    }

    /// Whether this node (not its children) reads `field` and, when given,
    /// compares it against `option`.
    pub fn references(&self, field: &str, option: Option<&str>) -> bool {
        if self.field.as_deref() != Some(field) {
            return false;
        }
        option.is_none_or(|option| self.mentions_option(option))
    }

    /// Whether `equals` or `notEquals` names `option`.
    pub fn mentions_option(&self, option: &str) -> bool {
        names_option(self.equals.as_ref(), option) || names_option(self.not_equals.as_ref(), option)
    }

    /// Whether this node or any descendant satisfies `predicate`.
    pub fn any_node(&self, predicate: &impl Fn(&FieldRule) -> bool) -> bool {
        predicate(self)
            || self.and.iter().any(|child| child.any_node(predicate))
            || self.or.iter().any(|child| child.any_node(predicate))
    }

    /// Copy of the node's own condition without its `and`/`or` children.
    pub fn head(&self) -> FieldRule {
        FieldRule {
            field: self.field.clone(),
            equals: self.equals.clone(),
            not_equals: self.not_equals.clone(),
            and: Vec::new(),
            or: Vec::new(),
        }
    }

    /// Builds a new tree where every node's own condition is replaced by the
    /// head returned from `node`. Children returned by `node` are ignored; the
    /// original children are mapped recursively instead.
    pub fn map_nodes(&self, node: &impl Fn(&FieldRule) -> FieldRule) -> FieldRule {
        let head = node(self);
        FieldRule {
            field: head.field,
            equals: head.equals,
            not_equals: head.not_equals,
            and: self.and.iter().map(|child| child.map_nodes(node)).collect(),
            or: self.or.iter().map(|child| child.map_nodes(node)).collect(),
        }
    }

    /// Builds a new tree without the descendants rejected by `keep`. The root
    /// itself is always kept; dropping a child drops its whole subtree.
    pub fn retain_nodes(&self, keep: &impl Fn(&FieldRule) -> bool) -> FieldRule {
        let filter = |children: &[FieldRule]| {
            children
                .iter()
                .filter(|child| keep(child))
                .map(|child| child.retain_nodes(keep))
                .collect::<Vec<_>>()
        };
        FieldRule {
            and: filter(&self.and),
            or: filter(&self.or),
            ..self.head()
        }
    }

    /// Number of nodes in the tree, root included.
    pub fn node_count(&self) -> usize {
        1 + self
            .and
            .iter()
            .chain(self.or.iter())
            .map(FieldRule::node_count)
            .sum::<usize>()
    }
}

fn names_option(value: Option<&Value>, option: &str) -> bool {
    matches!(value, Some(Value::String(text)) if text == option)
}
