use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Grams consumed per brew when a tea has no usable dose of its own.
pub const FALLBACK_DOSE: f64 = 4.0;

/// A purchased tea product with brewing metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tea {
    pub id: i64,
    pub name: String,
    /// Tea type ("green", "oolong", ...). `type` is the column name.
    #[serde(rename = "type")]
    pub kind: String,
    /// Grams per brew. 0 means unset; consumers fall back to [`FALLBACK_DOSE`].
    pub default_dose: f64,
    /// Free text, newline-delimited review log.
    pub notes: String,
    pub seller: String,
    pub price_per_gram: f64,
    pub grams_bought: f64,
    pub created_at: String,
}

/// Fields needed to create a tea. The id and timestamp come from the store.
#[derive(Debug, Clone, Default)]
pub struct NewTea {
    pub name: String,
    pub kind: String,
    pub default_dose: f64,
    pub notes: String,
    pub seller: String,
    pub price_per_gram: f64,
    pub grams_bought: f64,
}

/// One row of the admin bulk-update form, already validated.
#[derive(Debug, Clone)]
pub struct TeaUpdate {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub default_dose: f64,
    pub notes: String,
    pub seller: String,
    pub price_per_gram: f64,
    pub grams_bought: f64,
    /// `(location_id, amount)` for every known location.
    pub amounts: Vec<(i64, f64)>,
}

/// A tea joined with its remaining grams per location, for the admin page.
#[derive(Debug, Clone)]
pub struct TeaInventory {
    pub tea: Tea,
    /// `location_id -> grams remaining`. Missing rows read as 0.
    pub amounts: HashMap<i64, f64>,
}

impl TeaInventory {
    pub fn amount_at(&self, location_id: i64) -> f64 {
        self.amounts.get(&location_id).copied().unwrap_or(0.0)
    }
}

/// A physical place where tea is stored and consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A location plus how many teas there still have a positive amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub tea_count: i64,
}

/// The tea currently proposed for brewing at a location: the one with the
/// largest positive remaining amount, ties broken by name.
#[derive(Debug, Clone)]
pub struct BrewPick {
    pub tea_id: i64,
    pub name: String,
    pub kind: String,
    pub default_dose: f64,
    pub notes: String,
    /// Grams remaining at the selected location.
    pub amount: f64,
}

impl BrewPick {
    /// Grams to subtract on confirm: the tea's own dose, or
    /// [`FALLBACK_DOSE`] when that is unset or not positive.
    pub fn dose(&self) -> f64 {
        if self.default_dose > 0.0 {
            self.default_dose
        } else {
            FALLBACK_DOSE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(default_dose: f64) -> BrewPick {
        BrewPick {
            tea_id: 1,
            name: "sencha".to_string(),
            kind: "green".to_string(),
            default_dose,
            notes: String::new(),
            amount: 10.0,
        }
    }

    #[test]
    fn dose_uses_teas_own_value() {
        assert_eq!(pick(6.5).dose(), 6.5);
    }

    #[test]
    fn dose_falls_back_when_unset() {
        assert_eq!(pick(0.0).dose(), FALLBACK_DOSE);
        assert_eq!(pick(-1.0).dose(), FALLBACK_DOSE);
    }
}
