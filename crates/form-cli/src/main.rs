use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use form_spec::{
    CascadePolicy, CheckResult, FieldDeleteMode, Form, OptionDeleteMode, check, delete_field,
    delete_option, find_rules_referencing, rename_field, rename_option, resolve_visibility,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "FORM_RULES_LOG";
const POLICY_ENV: &str = "FORM_RULES_POLICY";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Inspect and repair form visibility rules",
    long_about = "Evaluates visibleIf rules against answers, locates rule references and applies field/option renames and deletes with rule repair"
)]
struct Cli {
    /// Log maintainer decisions to stderr (overridden by FORM_RULES_LOG).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the visibility of every section and field for a set of answers.
    Visibility {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the answers JSON object.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Evaluate schedule windows at this RFC 3339 instant instead of now.
        #[arg(long, value_name = "TIMESTAMP")]
        at: Option<String>,
    },
    /// List every rule node reading a field (optionally compared to an option).
    Refs {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long)]
        field: String,
        #[arg(long)]
        option: Option<String>,
    },
    /// Rename a field and every rule that reads it.
    RenameField {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Write the repaired form here instead of stdout.
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
    },
    /// Rename an option of a field and every rule comparing against it.
    RenameOption {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long)]
        field: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
    },
    /// Delete a field and clear the rules that depend on it.
    DeleteField {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long)]
        field: String,
        /// Cascade policy JSON (defaults to FORM_RULES_POLICY when set).
        #[arg(long, value_name = "POLICY")]
        policy: Option<PathBuf>,
        /// Also strip nested and/or nodes that read the field.
        #[arg(long)]
        prune: bool,
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
    },
    /// Delete an option from a field.
    DeleteOption {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long)]
        field: String,
        #[arg(long)]
        option: String,
        #[arg(long, value_name = "POLICY")]
        policy: Option<PathBuf>,
        /// Clear every rule that compares against the deleted option.
        #[arg(long)]
        clear_rules: bool,
        #[arg(long, value_name = "OUT")]
        out: Option<PathBuf>,
    },
    /// Report dangling references and duplicate names.
    Check {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
    /// Print the JSON Schema of the form document.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Visibility { form, answers, at } => run_visibility(form, answers, at),
        Command::Refs {
            form,
            field,
            option,
        } => run_refs(form, &field, option.as_deref()),
        Command::RenameField {
            form,
            from,
            to,
            out,
        } => {
            let current = read_form(&form)?;
            emit_form(&rename_field(&current, &from, &to)?, out)
        }
        Command::RenameOption {
            form,
            field,
            from,
            to,
            out,
        } => {
            let current = read_form(&form)?;
            emit_form(&rename_option(&current, &field, &from, &to)?, out)
        }
        Command::DeleteField {
            form,
            field,
            policy,
            prune,
            out,
        } => {
            let current = read_form(&form)?;
            let mut policy = resolve_policy(policy)?;
            if prune {
                policy.field_delete = FieldDeleteMode::Prune;
            }
            ensure_field(&current, &field)?;
            emit_form(&delete_field(&current, &field, &policy), out)
        }
        Command::DeleteOption {
            form,
            field,
            option,
            policy,
            clear_rules,
            out,
        } => {
            let current = read_form(&form)?;
            let mut policy = resolve_policy(policy)?;
            if clear_rules {
                policy.option_delete = OptionDeleteMode::ClearOwner;
            }
            let owner = ensure_field(&current, &field)?;
            if owner.option(&option).is_none() {
                return Err(format!("field '{}' has no option '{}'", field, option).into());
            }
            emit_form(&delete_option(&current, &field, &option, &policy), out)
        }
        Command::Check { form } => run_check(form),
        Command::Schema => print_json(&schemars::schema_for!(Form)),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn read_form(path: &Path) -> CliResult<Form> {
    let contents = fs::read_to_string(path)?;
    let form: Form = serde_json::from_str(&contents)?;
    debug!(path = %path.display(), sections = form.sections.len(), "loaded form");
    Ok(form)
}

fn read_answers(path: Option<&Path>) -> CliResult<Value> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)?;
            let answers: Value = serde_json::from_str(&contents)?;
            if !answers.is_object() {
                return Err("answers must be a JSON object".into());
            }
            Ok(answers)
        }
        None => Ok(json!({})),
    }
}

fn ensure_field<'a>(form: &'a Form, name: &str) -> CliResult<&'a form_spec::Field> {
    form.field(name)
        .ok_or_else(|| format!("field '{}' does not exist", name).into())
}

fn resolve_policy(path: Option<PathBuf>) -> CliResult<CascadePolicy> {
    let candidate = path.or_else(|| env::var_os(POLICY_ENV).map(PathBuf::from));
    match candidate {
        Some(path) if !path.as_os_str().is_empty() => {
            let contents = fs::read_to_string(&path)?;
            let policy: CascadePolicy = serde_json::from_str(&contents)?;
            debug!(path = %path.display(), ?policy, "loaded cascade policy");
            Ok(policy)
        }
        _ => Ok(CascadePolicy::default()),
    }
}

fn parse_instant(raw: Option<&str>) -> CliResult<DateTime<Utc>> {
    match raw {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw.trim())
            .map_err(|error| format!("invalid timestamp '{}': {}", raw, error))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn run_visibility(
    form_path: PathBuf,
    answers_path: Option<PathBuf>,
    at: Option<String>,
) -> CliResult<()> {
    let form = read_form(&form_path)?;
    let answers = read_answers(answers_path.as_deref())?;
    let now = parse_instant(at.as_deref())?;
    let visibility = resolve_visibility(&form, &answers, now);
    print_json(&visibility)
}

fn run_refs(form_path: PathBuf, field: &str, option: Option<&str>) -> CliResult<()> {
    let form = read_form(&form_path)?;
    let references = find_rules_referencing(&form, field, option);
    if references.is_empty() {
        println!("No rules reference '{}'.", field);
        return Ok(());
    }
    for found in references {
        println!(
            "{}.{} = {}",
            found.owner,
            found.path,
            serde_json::to_string(found.rule)?
        );
    }
    Ok(())
}

fn run_check(form_path: PathBuf) -> CliResult<()> {
    let form = read_form(&form_path)?;
    let result = check(&form);
    println!(
        "Check result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_issues(&result);

    if result.valid {
        Ok(())
    } else {
        Err("check failed".into())
    }
}

fn describe_issues(result: &CheckResult) {
    for issue in &result.issues {
        let location = match (&issue.owner, &issue.path) {
            (Some(owner), Some(path)) => format!("{}.{}", owner, path),
            (Some(owner), None) => owner.to_string(),
            _ => "<form>".to_string(),
        };
        println!("  {} - {}", location, issue.message);
    }
}

fn emit_form(form: &Form, out: Option<PathBuf>) -> CliResult<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, serde_json::to_string_pretty(form)?)?;
            info!(path = %path.display(), "wrote form");
            println!("Wrote form to {}", path.display());
            Ok(())
        }
        None => print_json(form),
    }
}

fn print_json(value: &impl Serialize) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_instant_accepts_offsets() {
        let parsed = parse_instant(Some("2026-03-01T12:00:00+02:00")).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-01T10:00:00+00:00");
        assert!(parse_instant(Some("tomorrow")).is_err());
    }

    #[test]
    fn resolve_policy_reads_file() {
        let temp_dir = TempDir::new().expect("temp dir");
        let path = temp_dir.path().join("policy.json");
        fs::write(&path, r#"{"field_delete": "prune"}"#).expect("write policy");
        let policy = resolve_policy(Some(path)).unwrap();
        assert_eq!(policy.field_delete, FieldDeleteMode::Prune);
        assert_eq!(policy.option_delete, OptionDeleteMode::Keep);
    }
}
