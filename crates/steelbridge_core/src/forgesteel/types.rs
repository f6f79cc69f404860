use serde_json::Value;

/// Feature type tags used by the source export.
pub const TYPE_ABILITY: &str = "Ability";
pub const TYPE_BONUS: &str = "Bonus";
pub const TYPE_ABILITY_DAMAGE: &str = "Ability Damage";
pub const TYPE_CHARACTERISTIC_BONUS: &str = "Characteristic Bonus";
pub const TYPE_CHOICE: &str = "Choice";
pub const TYPE_CLASS_ABILITY: &str = "Class Ability";
pub const TYPE_DOMAIN_FEATURE: &str = "Domain Feature";
pub const TYPE_HEROIC_RESOURCE_GAIN: &str = "Heroic Resource Gain";
pub const TYPE_KIT: &str = "Kit";
pub const TYPE_LANGUAGE_CHOICE: &str = "Language Choice";
pub const TYPE_MULTIPLE_FEATURES: &str = "Multiple Features";
pub const TYPE_PERK: &str = "Perk";
pub const TYPE_PROJECT: &str = "Project";
pub const TYPE_SKILL_CHOICE: &str = "Skill Choice";
pub const TYPE_SPEED: &str = "Speed";

/// Container features whose names mark scaffolding, not content.
pub const SKIP_NAME_PATTERNS: &[&str] = &[
    "pt Ability",
    "Signature Ability",
    "1st-Level",
    "4th-Level",
    "5th-Level",
    "7th-Level",
    "9th-Level",
];

/// Ancestry trait that grants +1 stability.
pub const GROUNDED_TRAIT: &str = "Grounded";

pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub fn i64_field(value: &Value, key: &str) -> Option<i64> {
    value.get(key).and_then(Value::as_i64)
}

pub fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn feature_type(feature: &Value) -> &str {
    str_field(feature, "type").unwrap_or("")
}

pub fn feature_name(feature: &Value) -> &str {
    str_field(feature, "name").unwrap_or("")
}

pub fn feature_data<'a>(feature: &'a Value) -> &'a Value {
    feature.get("data").unwrap_or(&Value::Null)
}

pub fn selected_entries<'a>(feature: &'a Value) -> &'a [Value] {
    array_field(feature_data(feature), "selected")
}

pub fn selected_strings(feature: &Value) -> Vec<String> {
    selected_entries(feature)
        .iter()
        .filter_map(Value::as_str)
        .map(ToOwned::to_owned)
        .collect()
}
