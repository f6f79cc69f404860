mod acquire;
mod engine;
mod error;
mod index;
mod report;
mod resolve;
mod translate;
mod types;

pub use acquire::{AcquireOptions, Acquirer, FetchError, HttpFetch, RemoteFetch};
pub use engine::{Conversion, Engine};
pub use error::{ConvertError, ConvertErrorCode};
pub use index::{CatalogIndex, normalize_name};
pub use report::ReportBuilder;
pub use resolve::Resolver;
pub use translate::{foundry_skill_name, map_action_usage, translate};
pub use types::{
    ActorStats, CatalogRecord, CharacterModel, Characteristics, Confidence, ConversionReport,
    ConvertOptions, ElementKind, HeroState, LevelClaim, LevelSource, Outcome, OutcomeCounts,
    Provenance, Resolution, Selection, SourceTier, TargetDocument, TargetItem, TraceEntry,
};
