use crate::forgesteel;

use super::error::{ConvertError, ConvertErrorCode};
use super::index::CatalogIndex;
use super::translate::translate;
use super::types::{ConversionReport, ConvertOptions, TargetDocument};

/// One conversion run: the best-effort document plus the diagnostic trail.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub document: TargetDocument,
    pub report: ConversionReport,
}

/// Orchestrates parse -> translate for one source document against an
/// explicitly constructed catalog index. Callers that need a fresh
/// catalog acquire and build a new index; the engine never caches.
#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }

    pub fn convert_bytes<B: AsRef<[u8]>>(
        &self,
        bytes: B,
        index: &CatalogIndex,
        options: &ConvertOptions,
    ) -> Result<Conversion, ConvertError> {
        let model = forgesteel::parse_character(bytes.as_ref())?;
        let (document, report) = translate(&model, index, options)?;

        // Strict mode aborts only after the pass has finished, so the
        // failure message can name every missing element at once.
        if options.strict && report.has_blocking_issues {
            return Err(ConvertError::new(
                ConvertErrorCode::MissingRequiredElement,
                format!(
                    "unresolved mandatory elements: {}",
                    report.missing.join(", ")
                ),
            ));
        }

        Ok(Conversion { document, report })
    }
}
