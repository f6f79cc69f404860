pub mod sections;
pub mod types;

use serde_json::Value;

use crate::core_api::{CharacterModel, ConvertError, ConvertErrorCode};

/// Parses a `.ds-hero` export into the internal character model.
///
/// Only structural failures (not JSON, not an object, no character name)
/// are errors; missing optional sections degrade into an emptier model.
pub fn parse_character(bytes: &[u8]) -> Result<CharacterModel, ConvertError> {
    let sheet: Value = serde_json::from_slice(bytes).map_err(|e| {
        ConvertError::new(
            ConvertErrorCode::MalformedSource,
            format!("source document is not valid JSON: {e}"),
        )
    })?;
    sections::build_model(&sheet)
}
