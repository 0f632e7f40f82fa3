use serde_json::json;

use form_spec::{
    CascadePolicy, Field, FieldOption, FieldRule, FieldType, Form, IssueCode, Section, check,
    delete_field,
};

fn intake() -> Form {
    serde_json::from_str(include_str!("../tests/fixtures/intake_form.json")).expect("deserialize")
}

#[test]
fn fixture_has_no_issues() {
    let result = check(&intake());
    assert!(result.valid, "unexpected issues: {:?}", result.issues);
}

#[test]
fn dangling_nested_reference_is_reported() {
    let next = delete_field(&intake(), "age", &CascadePolicy::default());
    let result = check(&next);
    assert!(!result.valid);
    assert_eq!(result.issues.len(), 1);
    let issue = &result.issues[0];
    assert_eq!(issue.code, IssueCode::UnknownField);
    assert_eq!(
        issue.path.as_ref().map(ToString::to_string).as_deref(),
        Some("visibleIf.or[0]")
    );
}

#[test]
fn unknown_option_and_self_reference_are_reported() {
    let form = Form::new(vec![
        Section::new("Only")
            .with_field(Field::new("country", FieldType::Select).with_options(vec![
                FieldOption::new("FI", "Finland"),
            ]))
            .with_field(
                Field::new("city", FieldType::Text).with_rule(
                    FieldRule::equals("country", "NO")
                        .with_or(FieldRule::equals("country", "true"))
                        .with_and(FieldRule::not_equals("city", "")),
                ),
            ),
    ]);

    let result = check(&form);
    let codes = result
        .issues
        .iter()
        .map(|issue| issue.code)
        .collect::<Vec<_>>();
    assert_eq!(codes, vec![IssueCode::UnknownOption, IssueCode::SelfReference]);
}

#[test]
fn duplicate_names_are_reported() {
    let form = Form::new(vec![
        Section::new("One").with_field(Field::new("name", FieldType::Text)),
        Section::new("Two").with_field(
            Field::new("name", FieldType::Radio).with_options(vec![
                FieldOption::new("a", "A"),
                FieldOption::new("a", "Again"),
            ]),
        ),
    ]);

    let result = check(&form);
    let codes = result
        .issues
        .iter()
        .map(|issue| issue.code)
        .collect::<Vec<_>>();
    assert_eq!(codes, vec![IssueCode::DuplicateField, IssueCode::DuplicateOption]);

    let serialized = serde_json::to_value(&result).expect("serialize");
    assert_eq!(serialized["issues"][0]["code"], json!("duplicate_field"));
    assert_eq!(
        serialized["issues"][0]["owner"],
        json!({ "kind": "field", "section": 1, "field": 0 })
    );
}
