use serde_json::json;
use steelbridge_core::core_api::{
    ActorStats, Characteristics, Confidence, ConversionReport, ElementKind, HeroState, Outcome,
    OutcomeCounts, Provenance, TargetDocument, TargetItem,
};
use steelbridge_render::{render_actor_json, render_report_text};

fn sample_document() -> TargetDocument {
    TargetDocument {
        name: "Swami".to_string(),
        stats: ActorStats {
            level: 2,
            stamina_max: 30,
            stamina_value: 27,
            recoveries: 10,
            recovery_value: 10,
            movement: 6,
            stability: 1,
            characteristics: Characteristics {
                might: 2,
                agility: 2,
                reason: -1,
                intuition: 1,
                presence: 1,
            },
        },
        items: vec![
            TargetItem {
                name: "Fury".to_string(),
                kind: ElementKind::Class,
                body: Some(json!({
                    "name": "Fury",
                    "type": "class",
                    "_id": "fy3We6iiSrCgU8Dh",
                    "system": { "_dsid": "class-fury" }
                })),
                description: "<p>Rage made flesh.</p>".to_string(),
                action_usage: None,
                provenance: Provenance {
                    query: "Fury".to_string(),
                    expected: ElementKind::Class,
                    outcome: Outcome::Matched,
                    confidence: Some(Confidence::Exact),
                },
            },
            TargetItem {
                name: "Panther".to_string(),
                kind: ElementKind::Kit,
                body: None,
                description: "No description available".to_string(),
                action_usage: None,
                provenance: Provenance {
                    query: "Panther".to_string(),
                    expected: ElementKind::Kit,
                    outcome: Outcome::Placeholder,
                    confidence: None,
                },
            },
        ],
        skills: vec!["alertness".to_string(), "jump".to_string()],
        languages: vec!["Caelian".to_string()],
        biography: String::new(),
        state: HeroState {
            xp: 16,
            victories: 2,
            renown: 0,
            wealth: 1,
            surges: 1,
            stamina_damage: 3,
            stamina_temp: 0,
        },
    }
}

#[test]
fn actor_json_carries_stats_and_state() {
    let actor = render_actor_json(&sample_document());

    assert_eq!(actor["name"], "Swami");
    assert_eq!(actor["type"], "hero");
    assert_eq!(actor["system"]["stamina"]["max"], 30);
    assert_eq!(actor["system"]["stamina"]["value"], 27);
    assert_eq!(actor["system"]["characteristics"]["might"]["value"], 2);
    assert_eq!(actor["system"]["characteristics"]["reason"]["value"], -1);
    assert_eq!(actor["system"]["combat"]["stability"], 1);
    assert_eq!(actor["system"]["movement"]["value"], 6);
    assert_eq!(actor["system"]["recoveries"]["max"], 10);
    assert_eq!(actor["system"]["recoveries"]["recoveryValue"], 10);
    assert_eq!(actor["system"]["hero"]["victories"], 2);
    assert_eq!(actor["system"]["hero"]["skills"][0], "alertness");
    assert_eq!(actor["system"]["biography"]["languages"][0], "Caelian");
    assert_eq!(actor["system"]["damage"]["immunities"]["fire"], 0);
}

#[test]
fn matched_items_keep_their_body_and_gain_provenance() {
    let actor = render_actor_json(&sample_document());
    let class_item = &actor["items"][0];

    assert_eq!(class_item["_id"], "fy3We6iiSrCgU8Dh");
    assert_eq!(class_item["type"], "class");
    assert_eq!(class_item["system"]["level"], 2);
    assert_eq!(
        class_item["system"]["description"]["value"],
        "<p>Rage made flesh.</p>"
    );
    assert_eq!(
        class_item["flags"]["steelbridge"]["provenance"]["outcome"],
        "Matched"
    );
    assert_eq!(
        class_item["flags"]["steelbridge"]["provenance"]["confidence"],
        "Exact"
    );
}

#[test]
fn placeholder_items_carry_marker_and_platform_stats() {
    let actor = render_actor_json(&sample_document());
    let kit_item = &actor["items"][1];

    assert_eq!(kit_item["name"], "Panther");
    assert_eq!(kit_item["type"], "kit");
    assert_eq!(kit_item["flags"]["steelbridge"]["placeholder"], true);
    assert_eq!(kit_item["_stats"]["systemId"], "draw-steel");
    assert_eq!(kit_item["_stats"]["coreVersion"], "13.350");
    assert_eq!(kit_item["sort"], 0);
}

#[test]
fn report_text_lists_counts_warnings_and_trace() {
    let report = ConversionReport {
        counts: OutcomeCounts {
            matched: 10,
            approximated: 1,
            placeholder: 2,
            missing: 0,
        },
        warnings: vec!["level asserted as 2 by class, 3 by career; using 3".to_string()],
        missing: Vec::new(),
        trace: vec![steelbridge_core::core_api::TraceEntry {
            query: "Human".to_string(),
            expected: ElementKind::Ancestry,
            outcome: Outcome::Matched,
            confidence: Some(Confidence::Exact),
        }],
        has_blocking_issues: false,
    };

    let text = render_report_text(&report, false);
    assert!(text.contains("matched:      10"));
    assert!(text.contains("approximated: 1"));
    assert!(text.contains("level asserted"));
    assert!(!text.contains("trace:"));

    let verbose = render_report_text(&report, true);
    assert!(verbose.contains("trace:"));
    assert!(verbose.contains("\"Human\""));
}
