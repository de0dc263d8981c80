// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Emission factor table and CO₂e conversion.
//!
//! Factors are kg CO₂e per unit for travel (km) and home energy (kWh), and a
//! fixed kg CO₂e per serving for food. The two kinds never share a formula:
//! food tracks the diet choice, not the number of meals.

use crate::error::{FactorNotFoundError, ValidationError};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Top-level activity grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Travel,
    Home,
    Food,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Travel, Category::Home, Category::Food];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Travel => "travel",
            Category::Home => "home",
            Category::Food => "food",
        }
    }

    /// Match a stored or submitted category name (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
    }

    /// Unit of the logged quantity.
    pub fn unit(self) -> &'static str {
        match self {
            Category::Travel => "km",
            Category::Home => "kWh",
            Category::Food => "servings",
        }
    }

    /// Wrap a raw factor value in the kind this category uses.
    fn factor(self, value: f64) -> Factor {
        match self {
            Category::Travel | Category::Home => Factor::PerUnit { factor: value },
            Category::Food => Factor::FixedValue { factor: value },
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured emission factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Factor {
    /// kg CO₂e per logged unit, multiplied by the quantity.
    PerUnit { factor: f64 },
    /// kg CO₂e per serving, independent of any quantity.
    FixedValue { factor: f64 },
}

impl Factor {
    pub fn value(&self) -> f64 {
        match *self {
            Factor::PerUnit { factor } | Factor::FixedValue { factor } => factor,
        }
    }

    /// CO₂e for one submission, rounded to 2 decimals.
    ///
    /// Per-unit factors require a finite quantity greater than zero. Fixed
    /// factors do not use the quantity, but one that is given must still be
    /// a finite non-negative number.
    ///
    /// The result always fits the decimal range the aggregator sums in.
    pub fn co2(&self, quantity: Option<f64>) -> Result<f64, ValidationError> {
        match *self {
            Factor::PerUnit { factor } => {
                let quantity = quantity.ok_or(ValidationError::MissingQuantity)?;
                if !quantity.is_finite() || quantity <= 0.0 {
                    return Err(ValidationError::NonPositiveQuantity(quantity));
                }
                to_decimal(quantity * factor)
                    .map(round2_decimal)
                    .and_then(|d| d.to_f64())
                    .ok_or(ValidationError::QuantityTooLarge(quantity))
            }
            Factor::FixedValue { factor } => {
                if let Some(quantity) = quantity {
                    if !quantity.is_finite() || quantity < 0.0 {
                        return Err(ValidationError::NegativeQuantity(quantity));
                    }
                }
                Ok(round2(factor))
            }
        }
    }
}

/// Round half away from zero to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    to_decimal(value)
        .map(round2_decimal)
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Convert through the shortest round-trip representation, so `2.675`
/// becomes exactly `2.675` rather than its binary neighbour.
///
/// `None` for non-finite values and magnitudes beyond `Decimal::MAX`.
pub(crate) fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    value
        .to_string()
        .parse()
        .ok()
        .or_else(|| Decimal::from_f64(value))
}

pub(crate) fn round2_decimal(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Immutable mapping `category → subtype → factor`.
#[derive(Debug, Clone)]
pub struct EmissionFactorTable {
    factors: BTreeMap<Category, BTreeMap<String, Factor>>,
}

impl Default for EmissionFactorTable {
    /// Built-in factors.
    fn default() -> Self {
        let raw: [(Category, &[(&str, f64)]); 3] = [
            (
                Category::Travel,
                &[("car", 0.17), ("bus", 0.1), ("train", 0.04), ("plane", 0.25)],
            ),
            (Category::Home, &[("electricity", 0.64)]),
            (
                Category::Food,
                &[("plant-based", 2.5), ("mixed", 5.0), ("meat-heavy", 7.5)],
            ),
        ];

        let factors = raw
            .into_iter()
            .map(|(category, entries)| {
                let subtypes = entries
                    .iter()
                    .map(|&(name, value)| (name.to_string(), category.factor(value)))
                    .collect();
                (category, subtypes)
            })
            .collect();

        Self { factors }
    }
}

impl EmissionFactorTable {
    /// Load a factor table from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, FactorTableError> {
        let json_data = fs::read_to_string(path.as_ref())
            .map_err(|e| FactorTableError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load a factor table from a JSON string shaped
    /// `{"travel": {"car": 0.17}, "home": {...}, "food": {...}}`.
    pub fn load_from_json(json_data: &str) -> Result<Self, FactorTableError> {
        let raw: BTreeMap<String, BTreeMap<String, f64>> = serde_json::from_str(json_data)
            .map_err(|e| FactorTableError::ParseError(e.to_string()))?;

        let mut factors = BTreeMap::new();
        for (category_name, entries) in raw {
            let category = Category::parse(&category_name)
                .ok_or_else(|| FactorTableError::UnknownCategory(category_name.clone()))?;
            if factors.contains_key(&category) {
                return Err(FactorTableError::DuplicateCategory(category_name));
            }

            let mut subtypes = BTreeMap::new();
            for (subtype, value) in entries {
                if !value.is_finite() || value <= 0.0 {
                    return Err(FactorTableError::InvalidFactor {
                        category: category_name,
                        subtype,
                        value,
                    });
                }
                subtypes.insert(subtype, category.factor(value));
            }
            factors.insert(category, subtypes);
        }

        let count: usize = factors.values().map(BTreeMap::len).sum();
        tracing::info!(count, "Loaded emission factors");
        Ok(Self { factors })
    }

    /// Look up a factor by raw category and subtype names.
    pub fn factor(&self, category: &str, subtype: &str) -> Result<Factor, FactorNotFoundError> {
        let not_found = || FactorNotFoundError {
            category: category.to_string(),
            subtype: subtype.to_string(),
        };
        let category = Category::parse(category).ok_or_else(not_found)?;
        self.factor_for(category, subtype).map_err(|_| not_found())
    }

    /// Look up a factor for a known category.
    pub fn factor_for(
        &self,
        category: Category,
        subtype: &str,
    ) -> Result<Factor, FactorNotFoundError> {
        self.factors
            .get(&category)
            .and_then(|subtypes| subtypes.get(subtype))
            .copied()
            .ok_or_else(|| FactorNotFoundError {
                category: category.to_string(),
                subtype: subtype.to_string(),
            })
    }

    /// Configured subtypes for a category, in name order.
    pub fn subtypes(&self, category: Category) -> impl Iterator<Item = (&str, Factor)> + '_ {
        self.factors
            .get(&category)
            .into_iter()
            .flat_map(|subtypes| subtypes.iter().map(|(name, f)| (name.as_str(), *f)))
    }
}

/// Errors from loading a factor table.
#[derive(Debug, thiserror::Error)]
pub enum FactorTableError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse factor table: {0}")]
    ParseError(String),

    #[error("Unknown category in factor table: {0}")]
    UnknownCategory(String),

    #[error("Category listed more than once in factor table: {0}")]
    DuplicateCategory(String),

    #[error("Factor for {category}/{subtype} must be positive (got {value})")]
    InvalidFactor {
        category: String,
        subtype: String,
        value: f64,
    },
}
