use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use crate::core_api::{
    CharacterModel, Characteristics, ConvertError, ConvertErrorCode, ElementKind, HeroState,
    LevelClaim, LevelSource, Selection,
};

use super::types::{
    GROUNDED_TRAIT, SKIP_NAME_PATTERNS, TYPE_ABILITY, TYPE_ABILITY_DAMAGE, TYPE_BONUS,
    TYPE_CHARACTERISTIC_BONUS, TYPE_CHOICE, TYPE_CLASS_ABILITY, TYPE_DOMAIN_FEATURE,
    TYPE_HEROIC_RESOURCE_GAIN, TYPE_KIT, TYPE_LANGUAGE_CHOICE, TYPE_MULTIPLE_FEATURES, TYPE_PERK,
    TYPE_PROJECT, TYPE_SKILL_CHOICE, TYPE_SPEED, array_field, feature_data, feature_name,
    feature_type, i64_field, selected_entries, selected_strings, str_field,
};

pub fn build_model(sheet: &Value) -> Result<CharacterModel, ConvertError> {
    if !sheet.is_object() {
        return Err(ConvertError::new(
            ConvertErrorCode::MalformedSource,
            "source document root is not an object",
        ));
    }
    let name = str_field(sheet, "name").unwrap_or("").trim();
    if name.is_empty() {
        return Err(ConvertError::new(
            ConvertErrorCode::MalformedSource,
            "source document has no character name (section: name)",
        ));
    }

    let mut model = CharacterModel {
        name: name.to_string(),
        ..CharacterModel::default()
    };

    collect_level_claims(sheet, &mut model);
    // Feature gating during the walk uses the same rule the translator
    // applies later: the highest level any source asserts.
    let level = model
        .level_claims
        .iter()
        .map(|claim| claim.level)
        .max()
        .unwrap_or(1);

    model.characteristics = collect_characteristics(sheet, level);
    collect_ancestry(sheet, &mut model);
    collect_culture(sheet, &mut model);
    collect_career(sheet, &mut model);
    collect_class(sheet, level, &mut model);
    collect_complication(sheet, &mut model);
    collect_top_level_features(sheet, &mut model);
    collect_state(sheet, &mut model);

    if let Some(biography) = str_field(sheet, "biography") {
        model.biography = biography.to_string();
    }

    model.skills = dedup_preserving_order(model.skills);
    model.languages = dedup_preserving_order(model.languages);

    debug!(
        character = %model.name,
        features = model.features.len(),
        abilities = model.abilities.len(),
        "parsed source document"
    );
    Ok(model)
}

fn collect_level_claims(sheet: &Value, model: &mut CharacterModel) {
    let sources = [
        ("class", LevelSource::Class),
        ("career", LevelSource::Career),
        ("complication", LevelSource::Complication),
    ];
    for (section, source) in sources {
        let Some(level) = sheet.get(section).and_then(|v| i64_field(v, "level")) else {
            continue;
        };
        if level > 0 {
            model.level_claims.push(LevelClaim {
                source,
                level: level as u32,
            });
        }
    }
}

fn collect_characteristics(sheet: &Value, level: u32) -> Characteristics {
    // Explicit values win: a top-level block first, then the class block.
    if let Some(block) = sheet.get("characteristics") {
        return characteristics_from_block(block);
    }
    let Some(class) = sheet.get("class") else {
        return Characteristics::default();
    };
    if let Some(block) = class.get("characteristics") {
        return characteristics_from_block(block);
    }

    // Older exports: primary characteristics start at 2, plus bonuses
    // granted by level features.
    let mut out = Characteristics::default();
    for primary in array_field(class, "primaryCharacteristics") {
        if let Some(name) = primary.as_str() {
            apply_characteristic(&mut out, name, 2);
        }
    }
    for level_block in array_field(class, "featuresByLevel") {
        let level_num = i64_field(level_block, "level").unwrap_or(1);
        if level_num > i64::from(level) {
            continue;
        }
        for feature in array_field(level_block, "features") {
            if feature_type(feature) != TYPE_CHARACTERISTIC_BONUS {
                continue;
            }
            let data = feature_data(feature);
            if let Some(name) = str_field(data, "characteristic") {
                let bonus = i64_field(data, "value").unwrap_or(0);
                bump_characteristic(&mut out, name, bonus);
            }
        }
    }
    out
}

fn characteristics_from_block(block: &Value) -> Characteristics {
    let mut out = Characteristics::default();
    match block {
        Value::Array(entries) => {
            for entry in entries {
                if let Some(name) = str_field(entry, "characteristic") {
                    apply_characteristic(&mut out, name, i64_field(entry, "value").unwrap_or(0));
                }
            }
        }
        Value::Object(map) => {
            for (name, value) in map {
                apply_characteristic(&mut out, name, value.as_i64().unwrap_or(0));
            }
        }
        _ => {}
    }
    out
}

fn apply_characteristic(out: &mut Characteristics, name: &str, value: i64) {
    match name.to_ascii_lowercase().as_str() {
        "might" => out.might = value,
        "agility" => out.agility = value,
        "reason" => out.reason = value,
        "intuition" => out.intuition = value,
        "presence" => out.presence = value,
        _ => {}
    }
}

fn bump_characteristic(out: &mut Characteristics, name: &str, value: i64) {
    match name.to_ascii_lowercase().as_str() {
        "might" => out.might += value,
        "agility" => out.agility += value,
        "reason" => out.reason += value,
        "intuition" => out.intuition += value,
        "presence" => out.presence += value,
        _ => {}
    }
}

fn collect_ancestry(sheet: &Value, model: &mut CharacterModel) {
    let Some(ancestry) = sheet.get("ancestry") else {
        return;
    };
    model.ancestry = selection_from(ancestry, ElementKind::Ancestry);

    for feature in array_field(ancestry, "features") {
        match feature_type(feature) {
            TYPE_CHOICE => {
                for selected in selected_entries(feature) {
                    ancestry_feature(selected, model);
                }
            }
            TYPE_LANGUAGE_CHOICE => model.languages.extend(selected_strings(feature)),
            TYPE_SKILL_CHOICE => model.skills.extend(selected_strings(feature)),
            _ => ancestry_feature(feature, model),
        }
    }
}

fn ancestry_feature(feature: &Value, model: &mut CharacterModel) {
    if feature_type(feature) == TYPE_SPEED {
        if let Some(speed) = i64_field(feature_data(feature), "speed") {
            model.ancestry_speed = Some(speed);
        }
        return;
    }
    if feature_name(feature) == GROUNDED_TRAIT {
        model.stability_bonus += 1;
    }
    if let Some(selection) = selection_from(feature, ElementKind::AncestryTrait) {
        model.features.push(selection);
    }
}

fn collect_culture(sheet: &Value, model: &mut CharacterModel) {
    let Some(culture) = sheet.get("culture") else {
        return;
    };
    model.culture = selection_from(culture, ElementKind::Culture);

    for section in ["language", "environment", "organization", "upbringing"] {
        let Some(block) = culture.get(section) else {
            continue;
        };
        match feature_type(block) {
            TYPE_LANGUAGE_CHOICE => model.languages.extend(selected_strings(block)),
            TYPE_SKILL_CHOICE => model.skills.extend(selected_strings(block)),
            _ => {
                // Some exports keep the chosen language directly on the
                // section rather than in a typed feature.
                for value in array_field(block, "selected") {
                    if let Some(language) = value.as_str() {
                        model.languages.push(language.to_string());
                    }
                }
            }
        }
    }
    for language in array_field(culture, "languages") {
        if let Some(language) = language.as_str() {
            model.languages.push(language.to_string());
        }
    }
}

fn collect_career(sheet: &Value, model: &mut CharacterModel) {
    let Some(career) = sheet.get("career") else {
        return;
    };
    model.career = selection_from(career, ElementKind::Career);

    for feature in array_field(career, "features") {
        match feature_type(feature) {
            TYPE_SKILL_CHOICE => model.skills.extend(selected_strings(feature)),
            TYPE_LANGUAGE_CHOICE => model.languages.extend(selected_strings(feature)),
            TYPE_BONUS | TYPE_CHARACTERISTIC_BONUS => {}
            TYPE_PERK => push_selected(feature, ElementKind::Perk, model),
            TYPE_PROJECT => push_selected(feature, ElementKind::Project, model),
            _ => {
                let name = feature_name(feature);
                if ["Skill", "Language", "Feature"]
                    .iter()
                    .any(|pattern| name.contains(pattern))
                {
                    continue;
                }
                if let Some(selection) = selection_from(feature, ElementKind::Feature) {
                    model.features.push(selection);
                }
            }
        }
    }
}

fn collect_class(sheet: &Value, level: u32, model: &mut CharacterModel) {
    let Some(class) = sheet.get("class") else {
        return;
    };
    model.class = selection_from(class, ElementKind::Class);
    model.class_recoveries = i64_field(class, "recoveries");

    // Skill picks can ride along on the characteristic entries.
    for entry in array_field(class, "characteristics") {
        for skill in array_field(entry, "skills") {
            if let Some(skill) = skill.as_str() {
                model.skills.push(skill.to_string());
            }
        }
    }

    let mut selected_ability_ids = BTreeSet::new();
    walk_feature_levels(class, level, model, &mut selected_ability_ids);

    for subclass in array_field(class, "subclasses") {
        if !subclass
            .get("selected")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            continue;
        }
        model.subclass = selection_from(subclass, ElementKind::Subclass);
        walk_feature_levels(subclass, level, model, &mut selected_ability_ids);
        break;
    }

    for ability in array_field(class, "abilities") {
        let id = str_field(ability, "id").unwrap_or("");
        if !selected_ability_ids.contains(id) {
            continue;
        }
        if let Some(selection) = ability_selection(ability) {
            model.abilities.push(selection);
        }
    }
}

fn walk_feature_levels(
    section: &Value,
    level: u32,
    model: &mut CharacterModel,
    selected_ability_ids: &mut BTreeSet<String>,
) {
    for level_block in array_field(section, "featuresByLevel") {
        let level_num = i64_field(level_block, "level").unwrap_or(1);
        if level_num > i64::from(level) {
            continue;
        }
        for feature in array_field(level_block, "features") {
            walk_level_feature(feature, model, selected_ability_ids);
        }
    }
}

fn walk_level_feature(
    feature: &Value,
    model: &mut CharacterModel,
    selected_ability_ids: &mut BTreeSet<String>,
) {
    match feature_type(feature) {
        TYPE_SKILL_CHOICE => model.skills.extend(selected_strings(feature)),
        TYPE_LANGUAGE_CHOICE => model.languages.extend(selected_strings(feature)),
        TYPE_CLASS_ABILITY => {
            for id in array_field(feature_data(feature), "selectedIDs") {
                if let Some(id) = id.as_str() {
                    selected_ability_ids.insert(id.to_string());
                }
            }
        }
        TYPE_KIT => {
            for kit in selected_entries(feature) {
                model.kit_speed_bonus = model.kit_speed_bonus.max(i64_field(kit, "speed").unwrap_or(0));
                if let Some(selection) = selection_from(kit, ElementKind::Kit) {
                    model.kits.push(selection);
                }
            }
        }
        TYPE_DOMAIN_FEATURE => {
            for selected in selected_entries(feature) {
                if let Some(selection) = ability_selection(selected) {
                    model.abilities.push(selection);
                }
            }
        }
        TYPE_PERK => push_selected(feature, ElementKind::Perk, model),
        TYPE_PROJECT => push_selected(feature, ElementKind::Project, model),
        TYPE_CHOICE => {
            for selected in selected_entries(feature) {
                let selected_type = feature_type(selected);
                if [TYPE_BONUS, TYPE_ABILITY_DAMAGE, TYPE_CHARACTERISTIC_BONUS]
                    .contains(&selected_type)
                {
                    continue;
                }
                if selected_type == TYPE_ABILITY {
                    if let Some(selection) = ability_selection(selected) {
                        model.abilities.push(selection);
                    }
                } else if let Some(selection) = selection_from(selected, ElementKind::Feature) {
                    model.features.push(selection);
                }
            }
        }
        TYPE_MULTIPLE_FEATURES => {
            for nested in array_field(feature_data(feature), "features") {
                match feature_type(nested) {
                    TYPE_ABILITY => {
                        if let Some(selection) = ability_selection(nested) {
                            model.abilities.push(selection);
                        }
                    }
                    TYPE_SKILL_CHOICE => model.skills.extend(selected_strings(nested)),
                    TYPE_LANGUAGE_CHOICE => model.languages.extend(selected_strings(nested)),
                    _ => {}
                }
            }
        }
        TYPE_BONUS | TYPE_CHARACTERISTIC_BONUS | TYPE_HEROIC_RESOURCE_GAIN => {}
        TYPE_ABILITY => {
            if let Some(selection) = ability_selection(feature) {
                model.abilities.push(selection);
            }
        }
        _ => {
            let name = feature_name(feature);
            if SKIP_NAME_PATTERNS
                .iter()
                .any(|pattern| name.contains(pattern))
            {
                return;
            }
            if let Some(selection) = selection_from(feature, ElementKind::Feature) {
                model.features.push(selection);
            }
        }
    }
}

fn collect_complication(sheet: &Value, model: &mut CharacterModel) {
    let Some(complication) = sheet.get("complication") else {
        return;
    };
    if complication.is_null() || complication.as_str() == Some("null") {
        return;
    }
    model.complication = selection_from(complication, ElementKind::Complication);
}

fn collect_top_level_features(sheet: &Value, model: &mut CharacterModel) {
    for feature in array_field(sheet, "features") {
        match feature_type(feature) {
            TYPE_SKILL_CHOICE => model.skills.extend(selected_strings(feature)),
            TYPE_LANGUAGE_CHOICE => model.languages.extend(selected_strings(feature)),
            TYPE_MULTIPLE_FEATURES => {
                for nested in array_field(feature_data(feature), "features") {
                    if feature_type(nested) == TYPE_SKILL_CHOICE {
                        model.skills.extend(selected_strings(nested));
                    }
                }
            }
            _ => {
                if let Some(selection) = selection_from(feature, ElementKind::Feature) {
                    model.features.push(selection);
                }
            }
        }
    }
}

fn collect_state(sheet: &Value, model: &mut CharacterModel) {
    let Some(state) = sheet.get("state") else {
        return;
    };
    model.state = HeroState {
        xp: i64_field(state, "xp").unwrap_or(0),
        victories: i64_field(state, "victories").unwrap_or(0),
        renown: i64_field(state, "renown").unwrap_or(0),
        wealth: i64_field(state, "wealth").unwrap_or(0),
        surges: i64_field(state, "surges").unwrap_or(0),
        stamina_damage: i64_field(state, "staminaDamage").unwrap_or(0),
        stamina_temp: i64_field(state, "staminaTemp").unwrap_or(0),
    };
    for item in array_field(state, "inventory") {
        if let Some(selection) = selection_from(item, ElementKind::Treasure) {
            model.inventory.push(selection);
        }
    }
}

fn push_selected(feature: &Value, kind: ElementKind, model: &mut CharacterModel) {
    for selected in selected_entries(feature) {
        if let Some(selection) = selection_from(selected, kind) {
            model.features.push(selection);
        }
    }
}

fn selection_from(value: &Value, kind: ElementKind) -> Option<Selection> {
    let name = feature_name(value).trim();
    if name.is_empty() {
        return None;
    }
    Some(Selection {
        name: name.to_string(),
        kind,
        description: str_field(value, "description").map(ToOwned::to_owned),
        action_usage: None,
    })
}

/// Ability payloads appear either wrapped (`data.ability`) or as direct
/// ability objects; the action economy tag lives at `type.usage`.
fn ability_selection(value: &Value) -> Option<Selection> {
    let ability = feature_data(value)
        .get("ability")
        .unwrap_or(value);
    let name = feature_name(ability).trim();
    if name.is_empty() {
        return None;
    }
    let action_usage = ability
        .get("type")
        .and_then(|t| t.get("usage"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned);
    Some(Selection {
        name: name.to_string(),
        kind: ElementKind::Ability,
        description: str_field(ability, "description").map(ToOwned::to_owned),
        action_usage,
    })
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
