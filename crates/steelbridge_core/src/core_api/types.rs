use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Compendium element categories, serialized with the Foundry type strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    #[serde(rename = "ability")]
    Ability,
    #[serde(rename = "ancestry")]
    Ancestry,
    #[serde(rename = "ancestrytrait")]
    AncestryTrait,
    #[serde(rename = "career")]
    Career,
    #[serde(rename = "class")]
    Class,
    #[serde(rename = "complication")]
    Complication,
    #[serde(rename = "culture")]
    Culture,
    #[serde(rename = "domain")]
    Domain,
    #[serde(rename = "feature")]
    Feature,
    #[serde(rename = "kit")]
    Kit,
    #[serde(rename = "language")]
    Language,
    #[serde(rename = "perk")]
    Perk,
    #[serde(rename = "project")]
    Project,
    #[serde(rename = "subclass")]
    Subclass,
    #[serde(rename = "treasure")]
    Treasure,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ability => "ability",
            Self::Ancestry => "ancestry",
            Self::AncestryTrait => "ancestrytrait",
            Self::Career => "career",
            Self::Class => "class",
            Self::Complication => "complication",
            Self::Culture => "culture",
            Self::Domain => "domain",
            Self::Feature => "feature",
            Self::Kit => "kit",
            Self::Language => "language",
            Self::Perk => "perk",
            Self::Project => "project",
            Self::Subclass => "subclass",
            Self::Treasure => "treasure",
        }
    }

    /// Maps a type tag as it appears in catalog files or source exports.
    /// The source export uses `ancestryTrait`; catalog files use the
    /// all-lowercase form.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ability" => Some(Self::Ability),
            "ancestry" => Some(Self::Ancestry),
            "ancestrytrait" | "ancestryTrait" => Some(Self::AncestryTrait),
            "career" => Some(Self::Career),
            "class" => Some(Self::Class),
            "complication" => Some(Self::Complication),
            "culture" => Some(Self::Culture),
            "domain" => Some(Self::Domain),
            "feature" => Some(Self::Feature),
            "kit" => Some(Self::Kit),
            "language" => Some(Self::Language),
            "perk" => Some(Self::Perk),
            "project" => Some(Self::Project),
            "subclass" => Some(Self::Subclass),
            "treasure" => Some(Self::Treasure),
            _ => None,
        }
    }
}

/// One reference game element from the compendium. `source` carries the
/// full catalog document so matches can be embedded verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub name: String,
    pub kind: ElementKind,
    pub source: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTier {
    Local,
    Cache,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Exact,
    Normalized,
    Fuzzy,
    TypeOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Matched,
    Approximated,
    Placeholder,
    Unresolved,
}

/// Result of one catalog lookup. Borrows the record from the index that
/// produced it; the report archives an owned trace entry instead.
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub query: String,
    pub expected: ElementKind,
    pub outcome: Outcome,
    pub confidence: Option<Confidence>,
    pub record: Option<&'a CatalogRecord>,
}

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub strict: bool,
    pub verbose: bool,
    /// Maximum edit distance accepted by the fuzzy strategy.
    pub fuzzy_distance: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            strict: false,
            verbose: false,
            fuzzy_distance: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Characteristics {
    pub might: i64,
    pub agility: i64,
    pub reason: i64,
    pub intuition: i64,
    pub presence: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelSource {
    Class,
    Career,
    Complication,
}

impl LevelSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Career => "career",
            Self::Complication => "complication",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelClaim {
    pub source: LevelSource,
    pub level: u32,
}

/// A named reference selected in the source export, waiting to be resolved
/// against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub name: String,
    pub kind: ElementKind,
    pub description: Option<String>,
    /// Action economy tag carried by ability selections ("Main Action",
    /// "Maneuver", ...).
    pub action_usage: Option<String>,
}

impl Selection {
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            action_usage: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroState {
    pub xp: i64,
    pub victories: i64,
    pub renown: i64,
    pub wealth: i64,
    pub surges: i64,
    pub stamina_damage: i64,
    pub stamina_temp: i64,
}

/// The parsed source document. Level claims may disagree; the model keeps
/// every claim and the translator arbitrates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterModel {
    pub name: String,
    pub characteristics: Characteristics,
    pub level_claims: Vec<LevelClaim>,
    pub ancestry: Option<Selection>,
    pub culture: Option<Selection>,
    pub career: Option<Selection>,
    pub class: Option<Selection>,
    pub subclass: Option<Selection>,
    pub complication: Option<Selection>,
    pub features: Vec<Selection>,
    pub abilities: Vec<Selection>,
    pub kits: Vec<Selection>,
    pub inventory: Vec<Selection>,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub biography: String,
    pub state: HeroState,
    pub ancestry_speed: Option<i64>,
    pub kit_speed_bonus: i64,
    pub class_recoveries: Option<i64>,
    pub stability_bonus: i64,
}

/// How an output item came to be: the resolution that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub query: String,
    pub expected: ElementKind,
    pub outcome: Outcome,
    pub confidence: Option<Confidence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetItem {
    pub name: String,
    pub kind: ElementKind,
    /// Full compendium document for matched items; `None` for placeholders.
    pub body: Option<Value>,
    pub description: String,
    pub action_usage: Option<String>,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorStats {
    pub level: u32,
    pub stamina_max: i64,
    pub stamina_value: i64,
    pub recoveries: i64,
    pub recovery_value: i64,
    pub movement: i64,
    pub stability: i64,
    pub characteristics: Characteristics,
}

/// The output actor document, built incrementally by the translator and
/// serialized only after every resolution has completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetDocument {
    pub name: String,
    pub stats: ActorStats,
    pub items: Vec<TargetItem>,
    pub skills: Vec<String>,
    pub languages: Vec<String>,
    pub biography: String,
    pub state: HeroState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub matched: usize,
    pub approximated: usize,
    pub placeholder: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub query: String,
    pub expected: ElementKind,
    pub outcome: Outcome,
    pub confidence: Option<Confidence>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub counts: OutcomeCounts,
    pub warnings: Vec<String>,
    pub missing: Vec<String>,
    pub trace: Vec<TraceEntry>,
    pub has_blocking_issues: bool,
}
