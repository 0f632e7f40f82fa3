use form_spec::{
    Form, RuleOwner, RulePath, RuleStep, find_rules_referencing, owner_rule, rule_at, walk_rules,
};

fn intake() -> Form {
    serde_json::from_str(include_str!("../tests/fixtures/intake_form.json")).expect("deserialize")
}

#[test]
fn finds_field_references_in_document_order() {
    let form = intake();
    let found = find_rules_referencing(&form, "age", None);

    let addresses = found
        .iter()
        .map(|found| (found.owner, found.path.to_string()))
        .collect::<Vec<_>>();
    assert_eq!(
        addresses,
        vec![
            (
                RuleOwner::Field {
                    section: 1,
                    field: 0
                },
                "visibleIf".to_string()
            ),
            (RuleOwner::Section { section: 2 }, "visibleIf".to_string()),
            (
                RuleOwner::Field {
                    section: 2,
                    field: 0
                },
                "visibleIf.or[0]".to_string()
            ),
        ]
    );
}

#[test]
fn option_filter_matches_equals_and_not_equals() {
    let form = intake();
    let finland = find_rules_referencing(&form, "country", Some("FI"));
    assert_eq!(finland.len(), 2);
    assert_eq!(finland[0].owner, RuleOwner::Section { section: 1 });
    assert!(finland[0].path.is_root());
    assert_eq!(finland[1].path.steps(), &[RuleStep::And(0)]);

    let sweden = find_rules_referencing(&form, "country", Some("SE"));
    assert_eq!(sweden.len(), 1);
    assert_eq!(sweden[0].path.steps(), &[RuleStep::Or(0)]);

    let seventeen = find_rules_referencing(&form, "age", Some("17"));
    assert_eq!(seventeen.len(), 1);
    assert_eq!(seventeen[0].rule.not_equals, Some(serde_json::json!("17")));

    assert!(find_rules_referencing(&form, "country", Some("NO")).is_empty());
}

#[test]
fn references_resolve_back_to_the_same_node() {
    let form = intake();
    for found in find_rules_referencing(&form, "country", None) {
        let resolved = rule_at(&form, found.owner, &found.path).expect("address resolves");
        assert!(std::ptr::eq(resolved, found.rule));
    }
}

#[test]
fn stale_addresses_resolve_to_none() {
    let form = intake();
    let owner = RuleOwner::Field {
        section: 1,
        field: 0,
    };
    assert!(owner_rule(&form, owner).is_some());
    assert!(rule_at(&form, owner, &RulePath::from(vec![RuleStep::Or(0)])).is_none());
    assert!(
        rule_at(
            &form,
            RuleOwner::Field {
                section: 9,
                field: 0
            },
            &RulePath::root()
        )
        .is_none()
    );
    assert!(owner_rule(&form, RuleOwner::Section { section: 0 }).is_none());
}

#[test]
fn walk_visits_every_node_once() {
    let form = intake();
    let mut visited = Vec::new();
    walk_rules(&form, &mut |owner, path, _| {
        visited.push(format!("{}.{}", owner, path));
    });

    assert_eq!(visited.len(), 9);
    let mut unique = visited.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), visited.len());
    assert_eq!(visited[0], "sections[0].fields[3].visibleIf");
    assert_eq!(visited[1], "sections[1].visibleIf");
    assert_eq!(visited[2], "sections[1].visibleIf.or[0]");
}
