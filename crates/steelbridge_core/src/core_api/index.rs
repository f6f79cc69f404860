use std::collections::BTreeMap;

use super::types::{CatalogRecord, ElementKind};

/// British spellings folded to the American forms used by the catalog.
const SPELLING_VARIANTS: &[(&str, &str)] = &[
    ("armour", "armor"),
    ("behaviour", "behavior"),
    ("colour", "color"),
    ("favour", "favor"),
    ("flavour", "flavor"),
    ("honour", "honor"),
    ("rumour", "rumor"),
    ("savour", "savor"),
    ("travelled", "traveled"),
    ("traveller", "traveler"),
    ("travelling", "traveling"),
    ("valour", "valor"),
    ("vigour", "vigor"),
];

/// Normalizes a name for index lookup: diacritics folded, lower-cased,
/// punctuation dropped (hyphens kept), whitespace collapsed, British
/// spellings folded to American. Idempotent.
pub fn normalize_name(raw: &str) -> String {
    let mut folded = String::with_capacity(raw.len());
    for c in raw.chars() {
        fold_char(c, &mut folded);
    }

    let mut out = String::with_capacity(folded.len());
    for token in folded.split_whitespace() {
        let token = SPELLING_VARIANTS
            .iter()
            .find(|(british, _)| *british == token)
            .map(|(_, american)| *american)
            .unwrap_or(token);
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(token);
    }
    out
}

fn fold_char(c: char, out: &mut String) {
    // Combining marks disappear entirely.
    if ('\u{0300}'..='\u{036f}').contains(&c) {
        return;
    }
    let folded: &str = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        'ñ' | 'Ñ' => "n",
        'ç' | 'Ç' => "c",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        'ß' => "ss",
        _ => {
            if c.is_alphanumeric() {
                for lower in c.to_lowercase() {
                    out.push(lower);
                }
            } else if c == '-' || c.is_whitespace() {
                out.push(if c == '-' { '-' } else { ' ' });
            }
            // Everything else is punctuation and is dropped.
            return;
        }
    };
    out.push_str(folded);
}

/// Read-only lookup structures over an acquired record set. Built once per
/// run; a fresh catalog means building a fresh index.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogIndex {
    records: Vec<CatalogRecord>,
    by_exact: BTreeMap<String, Vec<usize>>,
    by_normalized: BTreeMap<String, Vec<usize>>,
    by_kind: BTreeMap<ElementKind, Vec<usize>>,
    by_id: BTreeMap<String, usize>,
}

impl CatalogIndex {
    /// Colliding names (exact or normalized) are all retained, in catalog
    /// order, so downstream tie-breaks stay deterministic.
    pub fn build(records: Vec<CatalogRecord>) -> Self {
        let mut by_exact: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_normalized: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut by_kind: BTreeMap<ElementKind, Vec<usize>> = BTreeMap::new();
        let mut by_id = BTreeMap::new();

        for (position, record) in records.iter().enumerate() {
            by_exact.entry(record.name.clone()).or_default().push(position);
            by_normalized
                .entry(normalize_name(&record.name))
                .or_default()
                .push(position);
            by_kind.entry(record.kind).or_default().push(position);
            by_id.entry(record.id.clone()).or_insert(position);
        }

        Self {
            records,
            by_exact,
            by_normalized,
            by_kind,
            by_id,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record_by_id(&self, id: &str) -> Option<&CatalogRecord> {
        self.by_id.get(id).map(|&position| &self.records[position])
    }

    pub(crate) fn exact_candidates(&self, name: &str) -> &[usize] {
        self.by_exact.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn normalized_candidates(&self, normalized: &str) -> &[usize] {
        self.by_normalized
            .get(normalized)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn kind_candidates(&self, kind: ElementKind) -> &[usize] {
        self.by_kind.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn all_positions(&self) -> impl Iterator<Item = usize> + '_ {
        0..self.records.len()
    }

    pub(crate) fn record_at(&self, position: usize) -> &CatalogRecord {
        &self.records[position]
    }
}
