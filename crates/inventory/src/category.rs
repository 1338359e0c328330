//! Item categories and their schema descriptors.
//!
//! Every per-category rule (admissible patch fields, quantity unit, whether
//! counts must be whole) is read from a [`CategorySchema`], so ledger code is
//! written once and parameterised by category.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use rollstock_core::{DomainError, DomainResult, ItemId};

/// The three stock categories tracked by the factory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    /// Wound sheet-material rolls, counted in rolls.
    Roll,
    /// Pre-cut sheets, counted in sheets.
    Cut,
    /// Raw material inputs (resin etc.), weighed in kg.
    RawMaterial,
}

/// Static description of one category.
#[derive(Debug, PartialEq, Eq)]
pub struct CategorySchema {
    pub category: ItemCategory,
    /// Wire/storage name.
    pub name: &'static str,
    /// Attribute fields an operator may edit after registration.
    pub editable_fields: &'static [&'static str],
    /// Quantity unit label.
    pub unit: &'static str,
    /// Whether quantities and deltas must be whole numbers.
    pub integral_quantity: bool,
    /// Decimal places kept on computed quantities (3 for kg = grams).
    pub quantity_decimals: i32,
}

static ROLL: CategorySchema = CategorySchema {
    category: ItemCategory::Roll,
    name: "roll",
    editable_fields: &["thickness_mm", "width_cm", "length_m"],
    unit: "rolls",
    integral_quantity: true,
    quantity_decimals: 0,
};

static CUT: CategorySchema = CategorySchema {
    category: ItemCategory::Cut,
    name: "cut",
    editable_fields: &["company", "width_cm", "height_cm", "thickness_mm"],
    unit: "sheets",
    integral_quantity: true,
    quantity_decimals: 0,
};

static RAW_MATERIAL: CategorySchema = CategorySchema {
    category: ItemCategory::RawMaterial,
    name: "raw_material",
    editable_fields: &["received_on", "note"],
    unit: "kg",
    integral_quantity: false,
    quantity_decimals: 3,
};

impl ItemCategory {
    pub const ALL: [ItemCategory; 3] = [ItemCategory::Roll, ItemCategory::Cut, ItemCategory::RawMaterial];

    pub fn schema(self) -> &'static CategorySchema {
        match self {
            ItemCategory::Roll => &ROLL,
            ItemCategory::Cut => &CUT,
            ItemCategory::RawMaterial => &RAW_MATERIAL,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.schema().name
    }
}

impl core::fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "roll" | "rolls" => Ok(ItemCategory::Roll),
            "cut" | "cuts" => Ok(ItemCategory::Cut),
            "raw_material" | "raw-material" | "raw" => Ok(ItemCategory::RawMaterial),
            other => Err(DomainError::validation(format!(
                "unknown item category '{other}' (expected roll, cut or raw_material)"
            ))),
        }
    }
}

impl CategorySchema {
    pub fn allows_field(&self, field: &str) -> bool {
        field == "quantity" || self.editable_fields.contains(&field)
    }

    /// Round a computed quantity to the category's precision, so sums of
    /// movements land on the values an operator typed (0.3 - 0.1 - 0.2 == 0).
    /// Non-finite values and values too large to scale pass through unchanged.
    pub fn normalize(&self, quantity: f64) -> f64 {
        let factor = 10f64.powi(self.quantity_decimals);
        let scaled = (quantity * factor).round();
        if !scaled.is_finite() {
            return quantity;
        }
        let normalized = scaled / factor;
        // Avoid handing out -0.0.
        if normalized == 0.0 { 0.0 } else { normalized }
    }

    /// Check a stored quantity: finite, non-negative, whole when required.
    pub fn validate_quantity(&self, item_id: &ItemId, quantity: f64) -> DomainResult<()> {
        if !quantity.is_finite() {
            return Err(DomainError::validation(format!("quantity for {item_id} must be a finite number")));
        }
        if quantity < 0.0 {
            return Err(DomainError::negative_stock(item_id.as_str(), quantity));
        }
        if self.integral_quantity && quantity.fract() != 0.0 {
            return Err(DomainError::validation(format!(
                "quantity for {item_id} must be a whole number of {}",
                self.unit
            )));
        }
        Ok(())
    }

    /// Check a movement delta: finite, non-zero, whole when required.
    pub fn validate_delta(&self, delta: f64) -> DomainResult<()> {
        if !delta.is_finite() {
            return Err(DomainError::validation("delta must be a finite number"));
        }
        if delta == 0.0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        if self.normalize(delta) == 0.0 {
            return Err(DomainError::validation(format!(
                "delta is below the {} decimal places kept for {}",
                self.quantity_decimals, self.unit
            )));
        }
        if self.integral_quantity && delta.fract() != 0.0 {
            return Err(DomainError::validation(format!(
                "delta must be a whole number of {}",
                self.unit
            )));
        }
        Ok(())
    }
}
