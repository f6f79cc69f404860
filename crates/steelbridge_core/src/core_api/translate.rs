use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use crate::markup;

use super::error::{ConvertError, ConvertErrorCode};
use super::index::CatalogIndex;
use super::report::ReportBuilder;
use super::resolve::Resolver;
use super::types::{
    ActorStats, CatalogRecord, CharacterModel, Confidence, ConversionReport, ConvertOptions,
    ElementKind, Outcome, Provenance, Resolution, Selection, TargetDocument, TargetItem,
};

/// Documented defaults used when a required numeric input is unresolved.
const DEFAULT_MOVEMENT: i64 = 5;
const DEFAULT_STAMINA: i64 = 20;
const DEFAULT_RECOVERIES: i64 = 8;

const PLACEHOLDER_DESCRIPTION: &str = "No description available";

/// Abilities every hero owns regardless of build, pulled from the catalog
/// by id when present.
const BASIC_ABILITY_IDS: &[&str] = &[
    "advance",
    "aid-attack",
    "catch-breath",
    "charge",
    "defend",
    "disengage",
    "escape-grab",
    "grab",
    "heal",
    "knockback",
    "melee-free-strike",
    "ranged-free-strike",
    "ride",
    "stand-up",
];

/// Walks the character model and emits the target document plus the
/// conversion report. Always completes the full pass; strict mode marks
/// blocking issues in the report and the engine aborts afterwards.
pub fn translate(
    model: &CharacterModel,
    index: &CatalogIndex,
    options: &ConvertOptions,
) -> Result<(TargetDocument, ConversionReport), ConvertError> {
    if model.name.trim().is_empty() {
        return Err(ConvertError::new(
            ConvertErrorCode::MalformedSource,
            "character model has no name (section: name)",
        ));
    }

    let resolver = Resolver::new(index).with_fuzzy_distance(options.fuzzy_distance);
    let mut builder = ReportBuilder::new(options.strict);
    let mut items = Vec::new();

    let level = arbitrate_level(model, &mut builder);

    // Mandatory slots are converted by hand so their resolutions can feed
    // the derived numbers below.
    let ancestry_record = convert_slot(
        "ancestry",
        model.ancestry.as_ref(),
        ElementKind::Ancestry,
        true,
        options,
        &resolver,
        &mut builder,
        &mut items,
    );
    let class_record = convert_slot(
        "class",
        model.class.as_ref(),
        ElementKind::Class,
        true,
        options,
        &resolver,
        &mut builder,
        &mut items,
    );

    let optional_slots = [
        model.culture.as_ref(),
        model.career.as_ref(),
        model.subclass.as_ref(),
        model.complication.as_ref(),
    ];
    for selection in optional_slots.into_iter().flatten() {
        if let Some(item) = convert_selection(selection, false, options, &resolver, &mut builder) {
            items.push(item);
        }
    }

    for selection in model
        .features
        .iter()
        .chain(&model.kits)
        .chain(&model.abilities)
        .chain(&model.inventory)
    {
        if let Some(item) = convert_selection(selection, false, options, &resolver, &mut builder) {
            items.push(item);
        }
    }

    inject_basic_abilities(index, &mut items);

    let stats = derive_stats(
        model,
        level,
        ancestry_record,
        class_record,
        &mut builder,
    );

    let document = TargetDocument {
        name: model.name.clone(),
        stats,
        items,
        skills: model.skills.iter().map(|s| foundry_skill_name(s)).collect(),
        languages: model.languages.clone(),
        biography: markup::to_rich_text(&model.biography),
        state: model.state,
    };

    Ok((document, builder.finalize()))
}

/// Take the highest asserted level; disagreement is reported once but
/// never blocks output.
fn arbitrate_level(model: &CharacterModel, builder: &mut ReportBuilder) -> u32 {
    let Some(level) = model.level_claims.iter().map(|claim| claim.level).max() else {
        return 1;
    };
    let distinct: BTreeSet<u32> = model.level_claims.iter().map(|claim| claim.level).collect();
    if distinct.len() > 1 {
        let asserted = model
            .level_claims
            .iter()
            .map(|claim| format!("{} by {}", claim.level, claim.source.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        builder.warn(format!("level asserted as {asserted}; using {level}"));
    }
    level
}

/// Converts a named slot. Returns the resolved record for callers that
/// feed derived numbers. An absent mandatory slot is reported as missing.
#[allow(clippy::too_many_arguments)]
fn convert_slot<'a>(
    slot: &'static str,
    selection: Option<&Selection>,
    kind: ElementKind,
    mandatory: bool,
    options: &ConvertOptions,
    resolver: &Resolver<'a>,
    builder: &mut ReportBuilder,
    items: &mut Vec<TargetItem>,
) -> Option<&'a CatalogRecord> {
    let Some(selection) = selection else {
        if mandatory {
            builder.record(&Resolution {
                query: slot.to_string(),
                expected: kind,
                outcome: Outcome::Unresolved,
                confidence: None,
                record: None,
            });
            builder.warn(format!("source selects no {slot}"));
        }
        return None;
    };

    let resolution = resolver.resolve(&selection.name, kind);
    let record = resolution.record;
    let matched = matches!(
        resolution.outcome,
        Outcome::Matched | Outcome::Approximated
    );
    if let Some(item) = finish_selection(selection, resolution, mandatory, options, builder) {
        items.push(item);
    }
    if matched { record } else { None }
}

fn convert_selection(
    selection: &Selection,
    mandatory: bool,
    options: &ConvertOptions,
    resolver: &Resolver<'_>,
    builder: &mut ReportBuilder,
) -> Option<TargetItem> {
    let resolution = resolver.resolve(&selection.name, selection.kind);
    finish_selection(selection, resolution, mandatory, options, builder)
}

fn finish_selection(
    selection: &Selection,
    resolution: Resolution<'_>,
    mandatory: bool,
    options: &ConvertOptions,
    builder: &mut ReportBuilder,
) -> Option<TargetItem> {
    match resolution.outcome {
        Outcome::Matched | Outcome::Approximated => {
            builder.record(&resolution);
            if resolution.outcome == Outcome::Approximated {
                let candidate = resolution.record.map(|r| r.name.as_str()).unwrap_or("");
                builder.warn(format!(
                    "approximate match for {} \"{}\": \"{candidate}\"",
                    selection.kind.as_str(),
                    selection.name
                ));
            }
            Some(match resolution.record {
                Some(record) => full_item(selection, record, &resolution),
                None => placeholder_item(selection, &resolution),
            })
        }
        Outcome::Placeholder => {
            // Type-relaxed hits are too uncertain to embed; the item keeps
            // only the original name, the provenance keeps the trail.
            builder.record(&resolution);
            Some(placeholder_item(selection, &resolution))
        }
        Outcome::Unresolved => {
            if mandatory && options.strict {
                builder.record(&resolution);
                None
            } else {
                if mandatory {
                    builder.warn(format!(
                        "no catalog match for mandatory {} \"{}\"; emitting placeholder",
                        selection.kind.as_str(),
                        selection.name
                    ));
                }
                let downgraded = Resolution {
                    outcome: Outcome::Placeholder,
                    ..resolution
                };
                builder.record(&downgraded);
                Some(placeholder_item(selection, &downgraded))
            }
        }
    }
}

fn full_item(
    selection: &Selection,
    record: &CatalogRecord,
    resolution: &Resolution<'_>,
) -> TargetItem {
    TargetItem {
        name: record.name.clone(),
        kind: selection.kind,
        body: Some(record.source.clone()),
        description: item_description(selection, Some(record)),
        action_usage: selection.action_usage.as_deref().map(map_action_usage),
        provenance: provenance(resolution),
    }
}

fn placeholder_item(selection: &Selection, resolution: &Resolution<'_>) -> TargetItem {
    TargetItem {
        name: selection.name.clone(),
        kind: selection.kind,
        body: None,
        description: item_description(selection, None),
        action_usage: selection.action_usage.as_deref().map(map_action_usage),
        provenance: provenance(resolution),
    }
}

fn provenance(resolution: &Resolution<'_>) -> Provenance {
    Provenance {
        query: resolution.query.clone(),
        expected: resolution.expected,
        outcome: resolution.outcome,
        confidence: resolution.confidence,
    }
}

/// Compendium description first, the source text second, a fixed fallback
/// last. Everything passes through the rich-text transformer.
fn item_description(selection: &Selection, record: Option<&CatalogRecord>) -> String {
    if let Some(record) = record {
        let candidates = [
            record.source.get("description").and_then(Value::as_str),
            record
                .source
                .pointer("/system/description/value")
                .and_then(Value::as_str),
            record
                .source
                .pointer("/system/effect/before")
                .and_then(Value::as_str),
        ];
        for candidate in candidates.into_iter().flatten() {
            if !candidate.trim().is_empty() {
                return markup::to_rich_text(candidate);
            }
        }
    }
    if let Some(description) = &selection.description
        && !description.trim().is_empty()
    {
        return markup::to_rich_text(description);
    }
    PLACEHOLDER_DESCRIPTION.to_string()
}

fn inject_basic_abilities(index: &CatalogIndex, items: &mut Vec<TargetItem>) {
    for id in BASIC_ABILITY_IDS {
        let Some(record) = index.record_by_id(id) else {
            debug!(id, "basic ability not present in catalog");
            continue;
        };
        if record.kind != ElementKind::Ability {
            continue;
        }
        items.push(TargetItem {
            name: record.name.clone(),
            kind: ElementKind::Ability,
            body: Some(record.source.clone()),
            description: item_description(&Selection::new(record.name.clone(), ElementKind::Ability), Some(record)),
            action_usage: None,
            provenance: Provenance {
                query: (*id).to_string(),
                expected: ElementKind::Ability,
                outcome: Outcome::Matched,
                confidence: Some(Confidence::Exact),
            },
        });
    }
}

/// Derived numbers never fail the translation; a missing input substitutes
/// the documented default and records a warning.
fn derive_stats(
    model: &CharacterModel,
    level: u32,
    ancestry_record: Option<&CatalogRecord>,
    class_record: Option<&CatalogRecord>,
    builder: &mut ReportBuilder,
) -> ActorStats {
    let base_movement = match model.ancestry_speed {
        Some(speed) => speed,
        None => {
            if ancestry_record.is_none() {
                builder.warn(format!(
                    "movement uses default base {DEFAULT_MOVEMENT} (ancestry unresolved)"
                ));
            }
            DEFAULT_MOVEMENT
        }
    };
    let movement = base_movement + model.kit_speed_bonus;

    let stamina_max = match class_record {
        Some(record) => {
            let starting = record
                .source
                .pointer("/system/stamina/starting")
                .and_then(Value::as_i64)
                .unwrap_or(DEFAULT_STAMINA);
            let per_level = record
                .source
                .pointer("/system/stamina/level")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            starting + per_level * i64::from(level.saturating_sub(1))
        }
        None => {
            builder.warn(format!(
                "stamina maximum uses default {DEFAULT_STAMINA} (class unresolved)"
            ));
            DEFAULT_STAMINA
        }
    };

    let recoveries = match model.class_recoveries {
        Some(recoveries) => recoveries,
        None => {
            builder.warn(format!(
                "recoveries use default {DEFAULT_RECOVERIES} (class asserts none)"
            ));
            DEFAULT_RECOVERIES
        }
    };

    ActorStats {
        level,
        stamina_max,
        stamina_value: stamina_max - model.state.stamina_damage,
        recoveries,
        recovery_value: stamina_max / 3,
        movement,
        stability: model.stability_bonus,
        characteristics: model.characteristics,
    }
}

/// "Main Action" -> "main" and friends; unknown tags just lowercase.
pub fn map_action_usage(usage: &str) -> String {
    match usage {
        "Main Action" | "main" => "main".to_string(),
        "Maneuver" | "maneuver" => "maneuver".to_string(),
        "Move Action" | "move" => "move".to_string(),
        "Triggered Action" | "triggered" => "triggered".to_string(),
        "Free Action" | "free" => "free".to_string(),
        "Reaction" | "reaction" => "reaction".to_string(),
        other => other.to_lowercase(),
    }
}

/// Skill names convert from the source's Title Case to the target's
/// camelCase, with the handful of fixed exceptions spelled out.
pub fn foundry_skill_name(name: &str) -> String {
    const SPECIAL: &[(&str, &str)] = &[
        ("Aid Attack", "aidAttack"),
        ("Catch Breath", "catchBreath"),
        ("Escape Grab", "escapeGrab"),
        ("Handle Animals", "handleAnimals"),
        ("Melee Free Strike", "meleeFreeStrike"),
        ("Ranged Free Strike", "rangedFreeStrike"),
        ("Read Person", "readPerson"),
        ("Stand Up", "standUp"),
    ];
    if let Some((_, mapped)) = SPECIAL.iter().find(|(source, _)| *source == name) {
        return (*mapped).to_string();
    }

    let mut words = name.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };
    let mut out = first.to_lowercase();
    for word in words {
        let mut chars = word.chars();
        if let Some(head) = chars.next() {
            out.extend(head.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }
    out
}
