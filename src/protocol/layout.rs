//! Status word layouts
//!
//! Which status word carries which field is not consistent across controller
//! firmware and integration documents, so the mapping is data rather than code.
//! A [`FieldLayout`] names the word index of every field it knows about; fields
//! it does not map decode to `None`.
//!
//! **The layout in use must be confirmed against the target controller's
//! documentation.** Neither preset is authoritative.
//!
//! ## Presets
//! ```text
//! word │ stow (default)    │ wms
//! ─────┼───────────────────┼──────────────────────────────
//!   0  │ can_open          │ can_open (TCP link up)
//!   1  │ ready_to_operate  │ power_on
//!   2  │ manual_mode       │ automatic_mode
//!   3  │ power_on          │ manual_mode
//!   4  │ automatic_mode    │ night_mode (emergency stop)
//!   5  │ night_mode        │ mobile_quantity
//!   6  │ moving            │ position_1 (/100)
//!   7  │ lighting_on       │ position_2 (/100)
//!   8  │ mobile_quantity   │ lighting_on
//!   9  │ position_1        │ reserved
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RackError, Result};
use super::codec::STATUS_WORD_COUNT;

/// A named status field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    CanOpen,
    ReadyToOperate,
    ManualMode,
    PowerOn,
    AutomaticMode,
    /// Night mode; emergency stop on some controllers
    NightMode,
    Moving,
    LightingOn,
    MobileQuantity,
    Position1,
    Position2,
}

/// How a field's word is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `word == 1`
    Flag,
    /// Raw count
    Count,
    /// Raw position, optionally scaled by the layout divisor
    Position,
}

impl Field {
    pub const ALL: [Field; 11] = [
        Field::CanOpen,
        Field::ReadyToOperate,
        Field::ManualMode,
        Field::PowerOn,
        Field::AutomaticMode,
        Field::NightMode,
        Field::Moving,
        Field::LightingOn,
        Field::MobileQuantity,
        Field::Position1,
        Field::Position2,
    ];

    pub fn kind(&self) -> FieldKind {
        match self {
            Field::MobileQuantity => FieldKind::Count,
            Field::Position1 | Field::Position2 => FieldKind::Position,
            _ => FieldKind::Flag,
        }
    }

    /// snake_case name, as used in layout files
    pub fn name(&self) -> &'static str {
        match self {
            Field::CanOpen => "can_open",
            Field::ReadyToOperate => "ready_to_operate",
            Field::ManualMode => "manual_mode",
            Field::PowerOn => "power_on",
            Field::AutomaticMode => "automatic_mode",
            Field::NightMode => "night_mode",
            Field::Moving => "moving",
            Field::LightingOn => "lighting_on",
            Field::MobileQuantity => "mobile_quantity",
            Field::Position1 => "position_1",
            Field::Position2 => "position_2",
        }
    }
}

/// Mapping from fields to status word indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    /// Human-readable name of the layout
    pub name: String,

    /// Divisor applied to position fields (`None` = raw)
    #[serde(default)]
    pub position_divisor: Option<u16>,

    /// Field -> word index (0..10)
    pub fields: BTreeMap<Field, usize>,
}

impl FieldLayout {
    /// Layout of the Stow reference client
    pub fn stow() -> Self {
        Self::from_words(
            "stow",
            None,
            &[
                Field::CanOpen,
                Field::ReadyToOperate,
                Field::ManualMode,
                Field::PowerOn,
                Field::AutomaticMode,
                Field::NightMode,
                Field::Moving,
                Field::LightingOn,
                Field::MobileQuantity,
                Field::Position1,
            ],
        )
    }

    /// Layout from the WMS-data integration document, positions in 1/100
    pub fn wms() -> Self {
        Self::from_words(
            "wms",
            Some(100),
            &[
                Field::CanOpen,
                Field::PowerOn,
                Field::AutomaticMode,
                Field::ManualMode,
                Field::NightMode,
                Field::MobileQuantity,
                Field::Position1,
                Field::Position2,
                Field::LightingOn,
            ],
        )
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "stow" => Some(Self::stow()),
            "wms" => Some(Self::wms()),
            _ => None,
        }
    }

    /// Build a layout where `words[i]` is the field at word `i`
    fn from_words(name: &str, position_divisor: Option<u16>, words: &[Field]) -> Self {
        Self {
            name: name.to_string(),
            position_divisor,
            fields: words.iter().enumerate().map(|(i, f)| (*f, i)).collect(),
        }
    }

    /// Parse and validate a layout from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let layout: FieldLayout = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Read, parse and validate a layout file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            RackError::Config(format!("cannot read layout {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check word indices and the divisor
    pub fn validate(&self) -> Result<()> {
        if self.position_divisor == Some(0) {
            return Err(RackError::Config(format!(
                "layout '{}': position_divisor must be non-zero",
                self.name
            )));
        }
        for (field, &index) in &self.fields {
            if index >= STATUS_WORD_COUNT {
                return Err(RackError::Config(format!(
                    "layout '{}': field {} mapped to word {} (max {})",
                    self.name,
                    field.name(),
                    index,
                    STATUS_WORD_COUNT - 1
                )));
            }
        }
        Ok(())
    }

    /// Word index of a field, if mapped
    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.fields.get(&field).copied()
    }
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self::stow()
    }
}
