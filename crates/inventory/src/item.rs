use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rollstock_core::{Aggregate, AggregateRoot, DomainError, DomainResult, ItemId};

use crate::category::ItemCategory;
use crate::transaction::{NOTE_INBOUND, NOTE_OUTBOUND, Transaction};

/// Category-specific attributes of a stock item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ItemAttributes {
    Roll {
        thickness_mm: f64,
        width_cm: f64,
        length_m: f64,
    },
    Cut {
        company: String,
        width_cm: f64,
        height_cm: f64,
        thickness_mm: f64,
    },
    RawMaterial {
        name: String,
        grade: String,
        #[serde(default)]
        received_on: Option<NaiveDate>,
        #[serde(default)]
        note: String,
    },
}

impl ItemAttributes {
    pub fn category(&self) -> ItemCategory {
        match self {
            ItemAttributes::Roll { .. } => ItemCategory::Roll,
            ItemAttributes::Cut { .. } => ItemCategory::Cut,
            ItemAttributes::RawMaterial { .. } => ItemCategory::RawMaterial,
        }
    }

    fn validate(&self) -> DomainResult<()> {
        match self {
            ItemAttributes::Roll {
                thickness_mm,
                width_cm,
                length_m,
            } => {
                positive("thickness_mm", *thickness_mm)?;
                positive("width_cm", *width_cm)?;
                positive("length_m", *length_m)
            }
            ItemAttributes::Cut {
                width_cm,
                height_cm,
                thickness_mm,
                ..
            } => {
                positive("width_cm", *width_cm)?;
                positive("height_cm", *height_cm)?;
                positive("thickness_mm", *thickness_mm)
            }
            ItemAttributes::RawMaterial { name, grade, .. } => {
                if name.trim().is_empty() || grade.trim().is_empty() {
                    return Err(DomainError::validation("raw material name and grade are required"));
                }
                Ok(())
            }
        }
    }
}

fn positive(field: &str, value: f64) -> DomainResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DomainError::validation(format!("{field} must be a positive number")))
    }
}

/// Derive the identifier of a raw material from its name and grade.
pub fn raw_material_id(name: &str, grade: &str) -> DomainResult<ItemId> {
    let (name, grade) = (name.trim(), grade.trim());
    if name.is_empty() || grade.is_empty() {
        return Err(DomainError::validation("raw material name and grade are required"));
    }
    ItemId::new(format!("{name}/{grade}"))
}

/// Aggregate root: one stock record in a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    id: ItemId,
    attributes: ItemAttributes,
    quantity: f64,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    version: u64,
}

impl StockItem {
    /// Build a not-yet-persisted record (version 0). Call [`StockItem::validate`]
    /// before writing it anywhere.
    pub fn new(id: ItemId, attributes: ItemAttributes, quantity: f64, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            attributes,
            quantity,
            updated_at,
            version: 0,
        }
    }

    /// Register a raw material under its derived `name/grade` identifier.
    pub fn raw_material(
        name: &str,
        grade: &str,
        quantity: f64,
        received_on: Option<NaiveDate>,
        note: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let id = raw_material_id(name, grade)?;
        Ok(Self::new(
            id,
            ItemAttributes::RawMaterial {
                name: name.trim().to_string(),
                grade: grade.trim().to_string(),
                received_on,
                note: note.into(),
            },
            quantity,
            updated_at,
        ))
    }

    /// Rehydrate a record loaded from a store.
    pub fn restore(
        id: ItemId,
        attributes: ItemAttributes,
        quantity: f64,
        updated_at: DateTime<Utc>,
        version: u64,
    ) -> Self {
        Self {
            id,
            attributes,
            quantity,
            updated_at,
            version,
        }
    }

    pub fn id_typed(&self) -> &ItemId {
        &self.id
    }

    pub fn category(&self) -> ItemCategory {
        self.attributes.category()
    }

    pub fn attributes(&self) -> &ItemAttributes {
        &self.attributes
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Full record check: schema quantity rule, attribute rule, raw-material identity.
    pub fn validate(&self) -> DomainResult<()> {
        self.category().schema().validate_quantity(&self.id, self.quantity)?;
        self.attributes.validate()?;
        if let ItemAttributes::RawMaterial { name, grade, .. } = &self.attributes {
            let expected = raw_material_id(name, grade)?;
            if expected != self.id {
                return Err(DomainError::invalid_id(format!(
                    "raw material id must be '{expected}', got '{}'",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Stamp the update time without a version bump (used at registration).
    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }
}

impl AggregateRoot for StockItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Field changes for an existing item. Only fields admitted by the item's
/// category schema may be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thickness_mm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
}

impl ItemPatch {
    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.thickness_mm.is_some() {
            fields.push("thickness_mm");
        }
        if self.width_cm.is_some() {
            fields.push("width_cm");
        }
        if self.length_m.is_some() {
            fields.push("length_m");
        }
        if self.height_cm.is_some() {
            fields.push("height_cm");
        }
        if self.company.is_some() {
            fields.push("company");
        }
        if self.received_on.is_some() {
            fields.push("received_on");
        }
        if self.note.is_some() {
            fields.push("note");
        }
        if self.quantity.is_some() {
            fields.push("quantity");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }

    fn ensure_admissible(&self, category: ItemCategory) -> DomainResult<()> {
        let schema = category.schema();
        if let Some(field) = self.touched_fields().into_iter().find(|f| !schema.allows_field(f)) {
            return Err(DomainError::validation(format!(
                "field '{field}' does not apply to {category} items"
            )));
        }
        Ok(())
    }

    fn apply_to(&self, attributes: &mut ItemAttributes, quantity: &mut f64) {
        match attributes {
            ItemAttributes::Roll {
                thickness_mm,
                width_cm,
                length_m,
            } => {
                set(thickness_mm, self.thickness_mm);
                set(width_cm, self.width_cm);
                set(length_m, self.length_m);
            }
            ItemAttributes::Cut {
                company,
                width_cm,
                height_cm,
                thickness_mm,
            } => {
                set(company, self.company.clone());
                set(width_cm, self.width_cm);
                set(height_cm, self.height_cm);
                set(thickness_mm, self.thickness_mm);
            }
            ItemAttributes::RawMaterial { received_on, note, .. } => {
                if self.received_on.is_some() {
                    *received_on = self.received_on;
                }
                set(note, self.note.clone());
            }
        }
        set(quantity, self.quantity);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Command: record an inbound (+) or outbound (-) movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveStock {
    pub delta: f64,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: edit attributes and/or overwrite the quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditItem {
    pub patch: ItemPatch,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockCommand {
    MoveStock(MoveStock),
    EditItem(EditItem),
}

/// Event: StockMoved. Every one of these becomes a transaction log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMoved {
    pub item_id: ItemId,
    pub category: ItemCategory,
    pub delta: f64,
    pub note: String,
    pub occurred_at: DateTime<Utc>,
}

impl StockMoved {
    pub fn to_transaction(&self) -> Transaction {
        Transaction {
            category: self.category,
            item_id: self.item_id.clone(),
            delta: self.delta,
            note: self.note.clone(),
            occurred_at: self.occurred_at,
        }
    }
}

/// Event: ItemEdited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemEdited {
    pub item_id: ItemId,
    pub patch: ItemPatch,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StockEvent {
    StockMoved(StockMoved),
    ItemEdited(ItemEdited),
}

impl Aggregate for StockItem {
    type Command = StockCommand;
    type Event = StockEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            StockEvent::StockMoved(e) => {
                self.quantity = self.category().schema().normalize(self.quantity + e.delta);
                self.updated_at = e.occurred_at;
            }
            StockEvent::ItemEdited(e) => {
                e.patch.apply_to(&mut self.attributes, &mut self.quantity);
                self.updated_at = e.occurred_at;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            StockCommand::MoveStock(cmd) => self.handle_move(cmd),
            StockCommand::EditItem(cmd) => self.handle_edit(cmd),
        }
    }
}

impl StockItem {
    fn handle_move(&self, cmd: &MoveStock) -> Result<Vec<StockEvent>, DomainError> {
        let schema = self.category().schema();
        schema.validate_delta(cmd.delta)?;

        let new_quantity = schema.normalize(self.quantity + cmd.delta);
        if new_quantity < 0.0 {
            return Err(DomainError::insufficient_stock(
                self.id.as_str(),
                self.quantity,
                -cmd.delta,
            ));
        }
        // Catches overflow to infinity on large inbound movements.
        schema.validate_quantity(&self.id, new_quantity)?;

        let note = if cmd.note.trim().is_empty() {
            let default_note = if cmd.delta > 0.0 { NOTE_INBOUND } else { NOTE_OUTBOUND };
            default_note.to_string()
        } else {
            cmd.note.trim().to_string()
        };

        Ok(vec![StockEvent::StockMoved(StockMoved {
            item_id: self.id.clone(),
            category: self.category(),
            delta: cmd.delta,
            note,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_edit(&self, cmd: &EditItem) -> Result<Vec<StockEvent>, DomainError> {
        if cmd.patch.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        cmd.patch.ensure_admissible(self.category())?;

        // Validate the would-be state before emitting anything.
        let mut candidate = self.clone();
        cmd.patch.apply_to(&mut candidate.attributes, &mut candidate.quantity);
        candidate.validate()?;

        Ok(vec![StockEvent::ItemEdited(ItemEdited {
            item_id: self.id.clone(),
            patch: cmd.patch.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

/// Sum of current quantities (dashboard "total on hand" figure).
pub fn total_quantity<'a>(items: impl IntoIterator<Item = &'a StockItem>) -> f64 {
    items.into_iter().map(StockItem::quantity).sum()
}
