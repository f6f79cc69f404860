use std::fmt::Write as _;

use serde_json::{Map as JsonMap, Value as JsonValue, json};
use steelbridge_core::core_api::{
    ConversionReport, ElementKind, TargetDocument, TargetItem,
};

/// The target platform contract this renderer tracks.
const CORE_VERSION: &str = "13.350";
const SYSTEM_ID: &str = "draw-steel";
const SYSTEM_VERSION: &str = "0.8.1";
const DEFAULT_IMG: &str = "icons/svg/mystery-man.svg";

const DAMAGE_TYPES: &[&str] = &[
    "all",
    "acid",
    "cold",
    "corruption",
    "fire",
    "holy",
    "lightning",
    "poison",
    "psychic",
    "sonic",
];

/// Serializes a conversion result to the actor-import document.
pub fn render_actor_json(document: &TargetDocument) -> JsonValue {
    let stats = &document.stats;
    let items: Vec<JsonValue> = document
        .items
        .iter()
        .map(|item| render_item(item, stats.level))
        .collect();

    json!({
        "name": document.name,
        "type": "hero",
        "img": DEFAULT_IMG,
        "system": {
            "stamina": {
                "value": stats.stamina_value,
                "max": stats.stamina_max,
                "temporary": document.state.stamina_temp,
            },
            "characteristics": {
                "might": { "value": stats.characteristics.might },
                "agility": { "value": stats.characteristics.agility },
                "reason": { "value": stats.characteristics.reason },
                "intuition": { "value": stats.characteristics.intuition },
                "presence": { "value": stats.characteristics.presence },
            },
            "combat": {
                "save": { "threshold": 6, "bonus": "" },
                "size": { "value": 1, "letter": "M" },
                "stability": stats.stability,
                "turns": 1,
            },
            "biography": {
                "value": document.biography,
                "director": "",
                "languages": document.languages,
                "height": { "units": "in", "value": null },
                "weight": { "units": "lb", "value": null },
            },
            "movement": {
                "value": stats.movement,
                "types": ["walk"],
                "hover": false,
                "disengage": 1,
            },
            "damage": {
                "immunities": zeroed_damage_map(),
                "weaknesses": zeroed_damage_map(),
            },
            "recoveries": {
                "value": stats.recoveries,
                "max": stats.recoveries,
                "recoveryValue": stats.recovery_value,
            },
            "hero": {
                "primary": { "value": 0 },
                "epic": { "value": 0 },
                "surges": document.state.surges,
                "xp": document.state.xp,
                "victories": document.state.victories,
                "renown": document.state.renown,
                "wealth": document.state.wealth,
                "skills": document.skills,
                "preferredKit": null,
            },
        },
        "items": items,
        "effects": [],
        "flags": {},
    })
}

fn zeroed_damage_map() -> JsonValue {
    let mut map = JsonMap::new();
    for damage_type in DAMAGE_TYPES {
        map.insert((*damage_type).to_string(), json!(0));
    }
    JsonValue::Object(map)
}

/// Matched items embed the full compendium document; placeholders carry
/// only the original name and a marker. Both record their provenance.
fn render_item(item: &TargetItem, level: u32) -> JsonValue {
    let provenance =
        serde_json::to_value(&item.provenance).unwrap_or(JsonValue::Null);

    let Some(body) = &item.body else {
        return render_placeholder(item, provenance);
    };
    let JsonValue::Object(body) = body else {
        return render_placeholder(item, provenance);
    };

    let mut out = body.clone();
    out.insert("type".to_string(), json!(item.kind.as_str()));

    let system = out
        .entry("system".to_string())
        .or_insert_with(|| json!({}));
    if let JsonValue::Object(system) = system {
        system.insert(
            "description".to_string(),
            json!({ "value": item.description, "director": "" }),
        );
        if let Some(usage) = &item.action_usage {
            system.insert("type".to_string(), json!(usage));
        }
        if item.kind == ElementKind::Class {
            system.insert("level".to_string(), json!(level));
        }
    }

    let flags = out
        .entry("flags".to_string())
        .or_insert_with(|| json!({}));
    if let JsonValue::Object(flags) = flags {
        flags.insert("steelbridge".to_string(), json!({ "provenance": provenance }));
    }

    JsonValue::Object(out)
}

fn render_placeholder(item: &TargetItem, provenance: JsonValue) -> JsonValue {
    let mut system = JsonMap::new();
    system.insert(
        "description".to_string(),
        json!({ "value": item.description, "director": "" }),
    );
    if let Some(usage) = &item.action_usage {
        system.insert("type".to_string(), json!(usage));
    }

    json!({
        "name": item.name,
        "type": item.kind.as_str(),
        "img": DEFAULT_IMG,
        "system": system,
        "effects": [],
        "flags": {
            "steelbridge": { "placeholder": true, "provenance": provenance },
        },
        "_stats": {
            "compendiumSource": null,
            "duplicateSource": null,
            "exportSource": null,
            "coreVersion": CORE_VERSION,
            "systemId": SYSTEM_ID,
            "systemVersion": SYSTEM_VERSION,
            "lastModifiedBy": null,
        },
        "folder": null,
        "sort": 0,
        "ownership": { "default": 0 },
    })
}

/// Human-readable summary of a conversion report. Verbose adds the full
/// per-resolution trace.
pub fn render_report_text(report: &ConversionReport, verbose: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "conversion report");
    let _ = writeln!(out, "  matched:      {}", report.counts.matched);
    let _ = writeln!(out, "  approximated: {}", report.counts.approximated);
    let _ = writeln!(out, "  placeholder:  {}", report.counts.placeholder);
    let _ = writeln!(out, "  missing:      {}", report.counts.missing);

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "warnings:");
        for warning in &report.warnings {
            let _ = writeln!(out, "  - {warning}");
        }
    }
    if !report.missing.is_empty() {
        let _ = writeln!(out, "missing elements:");
        for query in &report.missing {
            let _ = writeln!(out, "  - {query}");
        }
    }
    if verbose && !report.trace.is_empty() {
        let _ = writeln!(out, "trace:");
        for entry in &report.trace {
            let confidence = entry
                .confidence
                .map(|c| format!("{c:?}"))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "  {:<12} {:<13} {:<10} \"{}\"",
                format!("{:?}", entry.outcome).to_lowercase(),
                entry.expected.as_str(),
                confidence.to_lowercase(),
                entry.query
            );
        }
    }
    if report.has_blocking_issues {
        let _ = writeln!(out, "strict mode: blocking issues present");
    }
    out
}
