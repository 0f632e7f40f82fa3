use serde_json::json;

use form_spec::{
    CascadePolicy, EditError, Field, FieldDeleteMode, FieldOption, FieldRule, FieldType, Form,
    OptionDeleteMode, RuleOwner, Section, delete_field, delete_option, field_name_for,
    find_rules_referencing, move_field, rename_field, rename_option, retitle_field,
};

fn intake() -> Form {
    serde_json::from_str(include_str!("../tests/fixtures/intake_form.json")).expect("deserialize")
}

fn addresses(form: &Form, field: &str) -> Vec<String> {
    find_rules_referencing(form, field, None)
        .iter()
        .map(|found| format!("{}.{}", found.owner, found.path))
        .collect()
}

#[test]
fn rename_field_rewrites_every_depth() {
    let form = intake();
    let before = addresses(&form, "age");

    let renamed = rename_field(&form, "age", "years").expect("rename");
    assert!(addresses(&renamed, "age").is_empty());
    assert_eq!(addresses(&renamed, "years"), before);
    assert!(renamed.field("years").is_some());
    assert!(renamed.field("age").is_none());

    let municipality = renamed.field("municipality").expect("field");
    let rule = municipality.visible_if.as_ref().expect("rule");
    assert_eq!(rule.equals, Some(json!("18")));
    assert_eq!(rule.and[0].field.as_deref(), Some("country"));
}

#[test]
fn rename_field_leaves_input_untouched() {
    let form = intake();
    let snapshot = form.clone();
    let _ = rename_field(&form, "age", "years").expect("rename");
    assert_eq!(form, snapshot);
}

#[test]
fn rename_field_rejects_existing_name() {
    let form = intake();
    assert_eq!(
        rename_field(&form, "age", "country"),
        Err(EditError::DuplicateField("country".into()))
    );
}

#[test]
fn rename_field_repairs_rules_after_schema_rename() {
    let form = Form::new(vec![
        Section::new("Only")
            .with_field(Field::new("years", FieldType::Number))
            .with_field(
                Field::new("comment", FieldType::Text).with_rule(FieldRule::equals("age", "18")),
            ),
    ]);
    let repaired = rename_field(&form, "age", "years").expect("repair");
    let rule = repaired.field("comment").and_then(|field| field.visible_if.as_ref());
    assert_eq!(rule.and_then(|rule| rule.field.as_deref()), Some("years"));
}

#[test]
fn rename_option_rewrites_only_owning_field_rules() {
    let form = Form::new(vec![
        Section::new("Only")
            .with_field(Field::new("country", FieldType::Radio).with_options(vec![
                FieldOption::new("FI", "Finland"),
                FieldOption::new("SE", "Sweden"),
            ]))
            .with_field(Field::new("code", FieldType::Text))
            .with_field(
                Field::new("notes", FieldType::Text).with_rule(
                    FieldRule::not_equals("country", "FI")
                        .with_and(FieldRule::equals("code", "FI"))
                        .with_or(FieldRule::equals("country", "FI")),
                ),
            ),
    ]);

    let renamed = rename_option(&form, "country", "FI", "FIN").expect("rename");
    let country = renamed.field("country").expect("field");
    assert!(country.option("FIN").is_some());
    assert!(country.option("FI").is_none());

    let rule = renamed
        .field("notes")
        .and_then(|field| field.visible_if.as_ref())
        .expect("rule");
    assert_eq!(rule.not_equals, Some(json!("FIN")));
    assert_eq!(rule.or[0].equals, Some(json!("FIN")));
    assert_eq!(rule.and[0].equals, Some(json!("FI")));
}

fn nested_form() -> Form {
    // age is read three groups deep, country four
    let deepest = FieldRule::equals("age", "18").with_and(FieldRule::not_equals("country", "FI"));
    let middle = FieldRule::equals("country", "SE").with_or(
        FieldRule::equals("code", "x").with_and(deepest),
    );
    let root = FieldRule::equals("code", "y").with_and(middle);
    Form::new(vec![
        Section::new("Only")
            .with_field(Field::new("age", FieldType::Number))
            .with_field(Field::new("country", FieldType::Select).with_options(vec![
                FieldOption::new("FI", "Finland"),
                FieldOption::new("SE", "Sweden"),
            ]))
            .with_field(Field::new("code", FieldType::Text))
            .with_field(Field::new("notes", FieldType::Text).with_rule(root)),
    ])
}

#[test]
fn rename_field_reaches_deeply_nested_nodes() {
    let form = nested_form();
    let before = addresses(&form, "age");
    assert_eq!(
        before,
        vec!["sections[0].fields[3].visibleIf.and[0].or[0].and[0]".to_string()]
    );

    let renamed = rename_field(&form, "age", "years").expect("rename");
    assert!(addresses(&renamed, "age").is_empty());
    assert_eq!(addresses(&renamed, "years"), before);
    assert_eq!(addresses(&renamed, "country"), addresses(&form, "country"));
}

#[test]
fn rename_option_reaches_deeply_nested_nodes() {
    let form = nested_form();
    let finland = |form: &Form, option: &str| {
        find_rules_referencing(form, "country", Some(option))
            .iter()
            .map(|found| format!("{}.{}", found.owner, found.path))
            .collect::<Vec<_>>()
    };
    let before = finland(&form, "FI");
    assert_eq!(
        before,
        vec!["sections[0].fields[3].visibleIf.and[0].or[0].and[0].and[0]".to_string()]
    );

    let renamed = rename_option(&form, "country", "FI", "FIN").expect("rename");
    assert!(finland(&renamed, "FI").is_empty());
    assert_eq!(finland(&renamed, "FIN"), before);
    assert_eq!(finland(&renamed, "SE"), finland(&form, "SE"));
}

#[test]
fn rename_option_reports_bad_targets() {
    let form = intake();
    assert_eq!(
        rename_option(&form, "ghost", "a", "b"),
        Err(EditError::UnknownField("ghost".into()))
    );
    assert_eq!(
        rename_option(&form, "country", "FI", "SE"),
        Err(EditError::DuplicateOption {
            field: "country".into(),
            option: "SE".into()
        })
    );
}

#[test]
fn delete_field_clears_section_rule() {
    let form = Form::new(vec![
        Section::new("Profile").with_field(Field::new("age", FieldType::Number)),
        Section::new("Adults").with_rule(FieldRule::equals("age", "18")),
    ]);
    let next = delete_field(&form, "age", &CascadePolicy::default());
    assert!(next.sections[1].visible_if.is_none());
    assert!(next.sections[0].fields.is_empty());
}

#[test]
fn shallow_delete_keeps_nested_references() {
    let form = intake();
    let next = delete_field(&form, "age", &CascadePolicy::default());

    assert!(next.field("age").is_none());
    assert!(next.sections[2].visible_if.is_none());
    let municipality = next.field("municipality").expect("field");
    assert!(municipality.visible_if.is_none());

    let notes = next.field("notes").expect("field");
    let rule = notes.visible_if.as_ref().expect("rule kept");
    assert_eq!(rule.or[0].field.as_deref(), Some("age"));

    assert!(
        find_rules_referencing(&next, "age", None)
            .iter()
            .all(|found| !found.path.is_root())
    );
}

#[test]
fn prune_delete_strips_nested_references() {
    let form = intake();
    let policy = CascadePolicy {
        field_delete: FieldDeleteMode::Prune,
        ..CascadePolicy::default()
    };
    let next = delete_field(&form, "age", &policy);

    assert!(find_rules_referencing(&next, "age", None).is_empty());
    let notes = next.field("notes").expect("field");
    let rule = notes.visible_if.as_ref().expect("rule kept");
    assert_eq!(rule.field.as_deref(), Some("interests"));
    assert!(rule.or.is_empty());
}

#[test]
fn delete_option_keeps_rules_by_default() {
    let form = intake();
    let next = delete_option(&form, "country", "FI", &CascadePolicy::default());
    let country = next.field("country").expect("field");
    assert!(country.option("FI").is_none());
    assert_eq!(country.options.len(), 1);
    assert_eq!(find_rules_referencing(&next, "country", Some("FI")).len(), 2);
}

#[test]
fn delete_option_can_clear_owners() {
    let form = intake();
    let policy = CascadePolicy {
        option_delete: OptionDeleteMode::ClearOwner,
        ..CascadePolicy::default()
    };
    let next = delete_option(&form, "country", "FI", &policy);
    assert!(next.sections[1].visible_if.is_none());
    assert!(next.field("municipality").expect("field").visible_if.is_none());
    assert!(next.field("notes").expect("field").visible_if.is_some());
}

#[test]
fn retitle_field_derives_name_and_cascades() {
    let form = intake();
    let next = retitle_field(&form, "age", "Age in years").expect("retitle");
    let field = next.field("age_in_years_1").expect("renamed field");
    assert_eq!(field.title, "Age in years");
    assert_eq!(addresses(&next, "age_in_years_1").len(), 3);
    assert_eq!(
        retitle_field(&form, "ghost", "Ghost"),
        Err(EditError::UnknownField("ghost".into()))
    );
}

#[test]
fn move_field_keeps_rules_attached() {
    let form = intake();
    let next = move_field(&form, "municipality", 0, 0).expect("move");
    assert_eq!(next.sections[0].fields[0].name, "municipality");
    assert_eq!(next.sections[1].fields.len(), 1);
    let found = find_rules_referencing(&next, "age", None);
    assert_eq!(
        found[0].owner,
        RuleOwner::Field {
            section: 0,
            field: 0
        }
    );
    assert_eq!(
        move_field(&form, "municipality", 7, 0),
        Err(EditError::UnknownSection(7))
    );
}

#[test]
fn field_names_derive_from_title_and_position() {
    assert_eq!(field_name_for("Your age?", 3), "your_age_3");
    assert_eq!(field_name_for("  E-mail / phone ", 1), "e_mail_phone_1");
    assert_eq!(field_name_for("???", 2), "field_2");
    assert_eq!(field_name_for("Ikä?", 1), "ikä_1");
    assert_eq!(field_name_for("Kotikunta / Hemkommun 2", 4), "kotikunta_hemkommun_2_4");
}
