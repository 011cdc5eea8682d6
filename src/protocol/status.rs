//! Status frame definitions
//!
//! A decoded 20-byte status report. Words are stored host-native; the layout
//! that was active at decode time gives them meaning.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::Serialize;

use super::codec::{encode_status, STATUS_WORD_COUNT};
use super::layout::{Field, FieldKind, FieldLayout};

/// A decoded status frame
///
/// Immutable; holds no reference to the connection it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusFrame {
    words: [u16; STATUS_WORD_COUNT],
    layout: Arc<FieldLayout>,
    captured_at: SystemTime,
}

impl StatusFrame {
    pub(crate) fn new(
        words: [u16; STATUS_WORD_COUNT],
        layout: Arc<FieldLayout>,
        captured_at: SystemTime,
    ) -> Self {
        Self {
            words,
            layout,
            captured_at,
        }
    }

    /// All ten words, host-native
    pub fn words(&self) -> &[u16; STATUS_WORD_COUNT] {
        &self.words
    }

    /// A single word, `None` past index 9
    pub fn word(&self, index: usize) -> Option<u16> {
        self.words.get(index).copied()
    }

    /// Re-encode to the 20 wire bytes
    pub fn as_bytes(&self) -> Bytes {
        encode_status(&self.words)
    }

    /// Space-separated uppercase hex of the wire bytes
    pub fn to_hex(&self) -> String {
        self.as_bytes()
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// When the last byte of the frame was received
    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    pub fn layout(&self) -> &FieldLayout {
        &self.layout
    }

    /// Raw word behind a field, if the layout maps it
    pub fn value(&self, field: Field) -> Option<u16> {
        self.layout.index_of(field).and_then(|i| self.word(i))
    }

    /// Boolean interpretation (`word == 1`)
    pub fn flag(&self, field: Field) -> Option<bool> {
        self.value(field).map(|w| w == 1)
    }

    pub fn can_open(&self) -> Option<bool> {
        self.flag(Field::CanOpen)
    }

    pub fn ready_to_operate(&self) -> Option<bool> {
        self.flag(Field::ReadyToOperate)
    }

    pub fn manual_mode(&self) -> Option<bool> {
        self.flag(Field::ManualMode)
    }

    pub fn power_on(&self) -> Option<bool> {
        self.flag(Field::PowerOn)
    }

    pub fn automatic_mode(&self) -> Option<bool> {
        self.flag(Field::AutomaticMode)
    }

    /// Night mode, or emergency stop on layouts that use the word that way
    pub fn night_mode(&self) -> Option<bool> {
        self.flag(Field::NightMode)
    }

    pub fn moving(&self) -> Option<bool> {
        self.flag(Field::Moving)
    }

    pub fn lighting_on(&self) -> Option<bool> {
        self.flag(Field::LightingOn)
    }

    pub fn mobile_quantity(&self) -> Option<u16> {
        self.value(Field::MobileQuantity)
    }

    pub fn position_1_raw(&self) -> Option<u16> {
        self.value(Field::Position1)
    }

    pub fn position_2_raw(&self) -> Option<u16> {
        self.value(Field::Position2)
    }

    /// Position 1 with the layout's divisor applied
    pub fn position_1(&self) -> Option<f64> {
        self.scaled(Field::Position1)
    }

    /// Position 2 with the layout's divisor applied
    pub fn position_2(&self) -> Option<f64> {
        self.scaled(Field::Position2)
    }

    fn scaled(&self, field: Field) -> Option<f64> {
        let raw = f64::from(self.value(field)?);
        Some(match self.layout.position_divisor {
            Some(divisor) => raw / f64::from(divisor),
            None => raw,
        })
    }

    /// Serializable view of the frame
    pub fn snapshot(&self) -> StatusSnapshot {
        let captured_at_ms = self
            .captured_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        StatusSnapshot {
            layout: self.layout.name.clone(),
            captured_at_ms,
            hex: self.to_hex(),
            words: self.words,
            can_open: self.can_open(),
            ready_to_operate: self.ready_to_operate(),
            manual_mode: self.manual_mode(),
            power_on: self.power_on(),
            automatic_mode: self.automatic_mode(),
            night_mode: self.night_mode(),
            moving: self.moving(),
            lighting_on: self.lighting_on(),
            mobile_quantity: self.mobile_quantity(),
            position_1: self.position_1(),
            position_2: self.position_2(),
        }
    }
}

impl fmt::Display for StatusFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for field in Field::ALL {
            let rendered = match field.kind() {
                FieldKind::Flag => self.flag(field).map(|b| (if b { "yes" } else { "no" }).to_string()),
                FieldKind::Count => self.value(field).map(|v| v.to_string()),
                FieldKind::Position => self.scaled(field).map(|v| v.to_string()),
            };
            if let Some(rendered) = rendered {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", field.name(), rendered)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Flat, serializable copy of a status frame
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub layout: String,
    pub captured_at_ms: u64,
    pub hex: String,
    pub words: [u16; STATUS_WORD_COUNT],
    pub can_open: Option<bool>,
    pub ready_to_operate: Option<bool>,
    pub manual_mode: Option<bool>,
    pub power_on: Option<bool>,
    pub automatic_mode: Option<bool>,
    pub night_mode: Option<bool>,
    pub moving: Option<bool>,
    pub lighting_on: Option<bool>,
    pub mobile_quantity: Option<u16>,
    pub position_1: Option<f64>,
    pub position_2: Option<f64>,
}
