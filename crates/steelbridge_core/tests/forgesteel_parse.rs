use std::fs;
use std::path::PathBuf;

use steelbridge_core::core_api::{ConvertErrorCode, ElementKind, LevelSource};
use steelbridge_core::forgesteel;

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn swami_bytes() -> Vec<u8> {
    let path = workspace_root().join("tests/fixtures/swami.ds-hero");
    fs::read(&path).unwrap_or_else(|e| panic!("failed to read {:?}: {}", path, e))
}

#[test]
fn parses_identity_and_characteristics() {
    let model = forgesteel::parse_character(&swami_bytes()).expect("fixture should parse");

    assert_eq!(model.name, "Swami");
    assert_eq!(model.characteristics.might, 2);
    assert_eq!(model.characteristics.agility, 2);
    assert_eq!(model.characteristics.reason, -1);
    assert_eq!(model.characteristics.intuition, 1);
    assert_eq!(model.characteristics.presence, 1);
}

#[test]
fn parses_named_selections() {
    let model = forgesteel::parse_character(&swami_bytes()).expect("fixture should parse");

    assert_eq!(model.ancestry.as_ref().map(|s| s.name.as_str()), Some("Human"));
    assert_eq!(model.culture.as_ref().map(|s| s.name.as_str()), Some("Urban"));
    assert_eq!(model.career.as_ref().map(|s| s.name.as_str()), Some("Soldier"));
    assert_eq!(model.class.as_ref().map(|s| s.name.as_str()), Some("Fury"));
    // Only the selected subclass is carried over.
    assert_eq!(
        model.subclass.as_ref().map(|s| s.name.as_str()),
        Some("Berserker")
    );
    assert!(model.complication.is_none());
}

#[test]
fn level_claims_carry_their_source() {
    let model = forgesteel::parse_character(&swami_bytes()).expect("fixture should parse");
    assert_eq!(model.level_claims.len(), 1);
    assert_eq!(model.level_claims[0].source, LevelSource::Class);
    assert_eq!(model.level_claims[0].level, 2);
}

#[test]
fn features_gate_on_level_and_skip_scaffolding() {
    let model = forgesteel::parse_character(&swami_bytes()).expect("fixture should parse");

    let names: Vec<&str> = model.features.iter().map(|f| f.name.as_str()).collect();
    assert!(names.contains(&"Resist the Unnatural"));
    assert!(names.contains(&"Staying Power"));
    assert!(names.contains(&"Monster Whisperer"));
    assert!(names.contains(&"Mighty Leaps"));
    // Level 3 content is above the asserted level 2.
    assert!(!names.contains(&"Overwhelm"));
    // Scaffolding containers never become features.
    assert!(!names.contains(&"1st-Level Features"));
    assert!(!names.contains(&"Class Ability"));

    let trait_kinds: Vec<ElementKind> = model
        .features
        .iter()
        .filter(|f| f.name == "Resist the Unnatural" || f.name == "Staying Power")
        .map(|f| f.kind)
        .collect();
    assert!(trait_kinds.iter().all(|&k| k == ElementKind::AncestryTrait));
}

#[test]
fn abilities_honor_selected_ids() {
    let model = forgesteel::parse_character(&swami_bytes()).expect("fixture should parse");

    assert_eq!(model.abilities.len(), 1);
    assert_eq!(model.abilities[0].name, "Brutal Slam");
    assert_eq!(model.abilities[0].kind, ElementKind::Ability);
    assert_eq!(model.abilities[0].action_usage.as_deref(), Some("Main Action"));
}

#[test]
fn kits_contribute_speed_bonus() {
    let model = forgesteel::parse_character(&swami_bytes()).expect("fixture should parse");
    assert_eq!(model.kits.len(), 1);
    assert_eq!(model.kits[0].name, "Panther");
    assert_eq!(model.kit_speed_bonus, 1);
}

#[test]
fn skills_languages_and_state_are_collected() {
    let model = forgesteel::parse_character(&swami_bytes()).expect("fixture should parse");

    assert_eq!(model.skills, vec!["Alertness", "Endurance", "Jump"]);
    assert_eq!(model.languages, vec!["Caelian"]);
    assert_eq!(model.class_recoveries, Some(10));
    assert_eq!(model.state.xp, 16);
    assert_eq!(model.state.victories, 2);
    assert_eq!(model.state.stamina_damage, 3);
    assert_eq!(model.inventory.len(), 1);
    assert_eq!(model.inventory[0].name, "Lightning Javelin");
    assert_eq!(model.inventory[0].kind, ElementKind::Treasure);
}

#[test]
fn malformed_sources_fail_with_malformed_source() {
    for bytes in [
        b"not json at all".as_slice(),
        br#"[1, 2, 3]"#.as_slice(),
        br#"{ "class": { "name": "Fury" } }"#.as_slice(),
        br#"{ "name": "   " }"#.as_slice(),
    ] {
        let err = forgesteel::parse_character(bytes)
            .expect_err("structurally broken input should fail");
        assert_eq!(err.code, ConvertErrorCode::MalformedSource);
    }
}
