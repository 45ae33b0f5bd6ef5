use dvh_match::{
    Alias, AliasKey, AliasTable, AliasTableEntry, ItemLaterality, LateralityTables, MatchMethod,
    PlanReference, ReferenceMatcher, build_alias_table,
};
use dvh_model::{ElementType, Laterality, Plan, PlanStructure};

fn plan_with(laterality: Laterality, structures: &[&str]) -> Plan {
    let mut plan = Plan::new("TEST", laterality);
    for name in structures {
        plan.insert_structure(PlanStructure::new(*name));
    }
    plan
}

fn matcher() -> ReferenceMatcher {
    ReferenceMatcher::default()
}

#[test]
fn exact_name_wins_over_alias() {
    // "Lung" is reachable both directly and via an alias pointing elsewhere;
    // step 1 must win.
    let plan = plan_with(Laterality::Right, &["Lung", "Whole Lung"]);
    let reference = PlanReference::new("Lung", ElementType::Structure)
        .with_alias(Alias::plain("Whole Lung"));
    let matched = matcher().match_reference(&reference, &plan).unwrap();
    assert_eq!(matched.name, "Lung");
}

#[test]
fn lateralized_reference_resolves_through_pattern() {
    // Plan laterality Right + Ipsilateral item gives indicator "R", so the
    // candidate "Lung_R" is looked up.
    let plan = plan_with(Laterality::Right, &["Lung_R", "Lung_L"]);
    let mut reference = PlanReference::new("Lung", ElementType::Structure)
        .with_laterality(ItemLaterality::Ipsilateral);
    let engine = matcher();
    assert!(engine.apply(&mut reference, &plan));
    assert_eq!(reference.matched.as_ref().unwrap().name, "Lung_R");
    assert_eq!(reference.match_method, MatchMethod::Auto);
}

#[test]
fn unlateralized_reference_never_tries_patterns() {
    let plan = plan_with(Laterality::Right, &["Lung_R"]);
    let reference = PlanReference::new("Lung", ElementType::Structure);
    assert!(matcher().match_reference(&reference, &plan).is_none());
}

#[test]
fn inline_alias_finds_renamed_element() {
    let plan = plan_with(Laterality::None, &["Bronchial Tree"]);
    let reference = PlanReference::new("ProxBronch", ElementType::Structure)
        .with_alias(Alias::plain("Bronchial Tree"));
    let matched = matcher().match_reference(&reference, &plan).unwrap();
    assert_eq!(matched.name, "Bronchial Tree");
}

#[test]
fn unsized_alias_falls_back_to_laterality_resolution() {
    let plan = plan_with(Laterality::Left, &["Parotid_L"]);
    let reference = PlanReference::new("ParotidGland", ElementType::Structure)
        .with_laterality(ItemLaterality::Ipsilateral)
        .with_alias(Alias::plain("Parotid"));
    let matched = matcher().match_reference(&reference, &plan).unwrap();
    assert_eq!(matched.name, "Parotid_L");
}

#[test]
fn sized_alias_formats_with_resolved_indicator() {
    let plan = plan_with(Laterality::Right, &["Lung(R)"]);
    let reference = PlanReference::new("Lung", ElementType::Structure)
        .with_laterality(ItemLaterality::Ipsilateral)
        .with_alias(Alias::sized("{base}({indicator})", 1));
    let matched = matcher().match_reference(&reference, &plan).unwrap();
    assert_eq!(matched.name, "Lung(R)");
}

#[test]
fn sized_alias_without_table_entry_is_silent() {
    // No indicator entry exists for size 9: the alias yields no match
    // instead of an error, and later aliases are still tried.
    let plan = plan_with(Laterality::Right, &["Lung_R", "Whole Lung"]);
    let reference = PlanReference::new("Lung9", ElementType::Structure)
        .with_laterality(ItemLaterality::Ipsilateral)
        .with_alias(Alias::sized("{base}#{indicator}", 9))
        .with_alias(Alias::plain("Whole Lung"));
    let matched = matcher().match_reference(&reference, &plan).unwrap();
    assert_eq!(matched.name, "Whole Lung");
}

#[test]
fn global_aliases_extend_inline_ones() {
    let entries = vec![AliasTableEntry {
        element_type: ElementType::Structure,
        name: "SpinalCord".to_string(),
        laterality: None,
        aliases: vec![Alias::plain("Cord")],
    }];
    let engine = ReferenceMatcher::new(build_alias_table(entries), LateralityTables::default());
    let plan = plan_with(Laterality::None, &["Cord"]);
    let reference = PlanReference::new("SpinalCord", ElementType::Structure);
    let matched = engine.match_reference(&reference, &plan).unwrap();
    assert_eq!(matched.name, "Cord");
}

#[test]
fn replace_flag_discards_global_aliases() {
    let entries = vec![AliasTableEntry {
        element_type: ElementType::Structure,
        name: "SpinalCord".to_string(),
        laterality: None,
        aliases: vec![Alias::plain("Cord")],
    }];
    let engine = ReferenceMatcher::new(build_alias_table(entries), LateralityTables::default());
    let plan = plan_with(Laterality::None, &["Cord"]);
    let mut reference = PlanReference::new("SpinalCord", ElementType::Structure);
    reference.replace_global_aliases = true;
    assert!(engine.match_reference(&reference, &plan).is_none());
}

#[test]
fn match_respects_element_type() {
    let mut plan = plan_with(Laterality::None, &[]);
    plan.insert_structure(PlanStructure::new("Total dose"));
    let reference = PlanReference::new("Total dose", ElementType::PlanProperty);
    assert!(matcher().match_reference(&reference, &plan).is_none());
}

#[test]
fn alias_table_merges_duplicate_keys() {
    let entries = vec![
        AliasTableEntry {
            element_type: ElementType::Structure,
            name: "Heart".to_string(),
            laterality: None,
            aliases: vec![Alias::plain("Cor")],
        },
        AliasTableEntry {
            element_type: ElementType::Structure,
            name: "Heart".to_string(),
            laterality: None,
            aliases: vec![Alias::plain("Whole Heart")],
        },
    ];
    let table: AliasTable = build_alias_table(entries);
    let key = AliasKey {
        element_type: ElementType::Structure,
        name: "Heart".to_string(),
        laterality: None,
    };
    assert_eq!(table.get(&key).map(Vec::len), Some(2));
}
