//! Exact-match retrieval of conditional distributions.
//!
//! Keys are normalized with the same functions the table builders use, so a
//! surname or ZIP typed by a caller matches the stored key whenever the source
//! row would have produced it. A miss is `Ok(None)`; there is no fuzzy matching
//! and no default distribution.

use crate::domain::{GeographyRecord, RaceDistribution, SurnameRecord};
use crate::error::StoreError;
use crate::store::TableStore;

/// Width of a ZCTA / 5-digit ZIP.
pub const GEO_ID_WIDTH: usize = 5;

/// Canonical surname key: whitespace removed, uppercased.
pub fn normalize_surname(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Canonical geography key.
///
/// - surrounding whitespace trimmed
/// - ZIP+4 suffix dropped (`12345-6789` -> `12345`)
/// - all-digit ids shorter than five characters left-padded with zeros, undoing
///   spreadsheets that stored ZIPs as numbers
pub fn normalize_geo_id(raw: &str) -> String {
    let id = raw.trim();
    let id = match id.split_once('-') {
        Some((zip, plus4)) if is_digits(zip) && is_digits(plus4) => zip,
        _ => id,
    };
    if is_digits(id) && id.len() < GEO_ID_WIDTH {
        format!("{id:0>width$}", width = GEO_ID_WIDTH)
    } else {
        id.to_string()
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Read-only view over the two tables.
pub struct Lookup<'a, S, G> {
    surnames: &'a S,
    geographies: &'a G,
}

impl<'a, S, G> Lookup<'a, S, G>
where
    S: TableStore<Record = SurnameRecord>,
    G: TableStore<Record = GeographyRecord>,
{
    pub fn new(surnames: &'a S, geographies: &'a G) -> Self {
        Self {
            surnames,
            geographies,
        }
    }

    /// P(race | surname), or `None` if the surname is not in the table.
    pub fn lookup_surname(&self, surname: &str) -> Result<Option<RaceDistribution>, StoreError> {
        let key = normalize_surname(surname);
        if key.is_empty() {
            return Ok(None);
        }
        Ok(self.surnames.get(&key)?.map(|r| r.distribution))
    }

    /// P(race | geography), or `None` if the id is not in the table.
    pub fn lookup_geography(&self, geo_id: &str) -> Result<Option<RaceDistribution>, StoreError> {
        let key = normalize_geo_id(geo_id);
        if key.is_empty() {
            return Ok(None);
        }
        Ok(self.geographies.get(&key)?.map(|r| r.distribution))
    }
}
