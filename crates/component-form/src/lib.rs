use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use form_spec::{
    CascadePolicy, EditError, FieldRule, Form, check as check_form, delete_field as delete_form_field,
    delete_option as delete_form_option, find_rules_referencing, is_visible as rule_visible,
    rename_field as rename_form_field, rename_option as rename_form_option, resolve_visibility,
};

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse form: {0}")]
    FormParse(#[source] serde_json::Error),
    #[error("failed to parse rule: {0}")]
    RuleParse(#[source] serde_json::Error),
    #[error("invalid timestamp '{0}'")]
    Timestamp(String),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error("edit rejected: {0}")]
    Edit(#[from] EditError),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    cascade: CascadePolicy,
}

fn load_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    if config_json.trim().is_empty() {
        Ok(ComponentConfig::default())
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)
    }
}

fn load_form(form_json: &str) -> Result<Form, ComponentError> {
    serde_json::from_str(form_json).map_err(ComponentError::FormParse)
}

fn load_rule(rule_json: &str) -> Result<Option<FieldRule>, ComponentError> {
    if rule_json.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(rule_json).map_err(ComponentError::RuleParse)
}

fn parse_answers(answers_json: &str) -> Value {
    serde_json::from_str(answers_json).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn parse_context(ctx_json: &str) -> Value {
    serde_json::from_str(ctx_json).unwrap_or_else(|_| Value::Object(Map::new()))
}

fn resolve_now(ctx: &Value) -> Result<DateTime<Utc>, ComponentError> {
    match ctx.get("now").and_then(Value::as_str) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|_| ComponentError::Timestamp(raw.to_string())),
        None => Ok(Utc::now()),
    }
}

fn encode(form: &Form) -> Result<Value, ComponentError> {
    serde_json::to_value(form).map_err(ComponentError::JsonEncode)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// Parses and re-emits a form document in canonical wire shape.
pub fn describe(form_json: &str) -> String {
    respond(load_form(form_json).and_then(|form| encode(&form)))
}

/// Evaluates a single rule; an empty rule document means "no rule".
pub fn is_visible(rule_json: &str, answers_json: &str) -> String {
    respond(load_rule(rule_json).map(|rule| {
        let answers = parse_answers(answers_json);
        json!({ "visible": rule_visible(rule.as_ref(), &answers) })
    }))
}

/// Visibility of every section and field. `ctx_json` may carry `now` as an
/// RFC 3339 timestamp for schedule windows.
pub fn resolve(form_json: &str, ctx_json: &str, answers_json: &str) -> String {
    respond(load_form(form_json).and_then(|form| {
        let ctx = parse_context(ctx_json);
        let now = resolve_now(&ctx)?;
        let answers = parse_answers(answers_json);
        let visibility = resolve_visibility(&form, &answers, now);
        serde_json::to_value(visibility).map_err(ComponentError::JsonEncode)
    }))
}

pub fn find_references(form_json: &str, field: &str, option: Option<&str>) -> String {
    respond(load_form(form_json).map(|form| {
        let references = find_rules_referencing(&form, field, option)
            .into_iter()
            .map(|found| {
                json!({
                    "owner": found.owner,
                    "path": found.path,
                    "location": found.path.to_string(),
                    "rule": found.rule,
                })
            })
            .collect::<Vec<_>>();
        Value::Array(references)
    }))
}

pub fn rename_field(form_json: &str, old: &str, new: &str) -> String {
    respond(load_form(form_json).and_then(|form| encode(&rename_form_field(&form, old, new)?)))
}

pub fn rename_option(form_json: &str, field: &str, old: &str, new: &str) -> String {
    respond(
        load_form(form_json)
            .and_then(|form| encode(&rename_form_option(&form, field, old, new)?)),
    )
}

pub fn delete_field(config_json: &str, form_json: &str, field: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let form = load_form(form_json)?;
        encode(&delete_form_field(&form, field, &config.cascade))
    }))
}

pub fn delete_option(config_json: &str, form_json: &str, field: &str, option: &str) -> String {
    respond(load_config(config_json).and_then(|config| {
        let form = load_form(form_json)?;
        encode(&delete_form_option(&form, field, option, &config.cascade))
    }))
}

pub fn check(form_json: &str) -> String {
    respond(load_form(form_json).and_then(|form| {
        serde_json::to_value(check_form(&form)).map_err(ComponentError::JsonEncode)
    }))
}
