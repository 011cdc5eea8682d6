//! Command definitions
//!
//! Represents the 4-byte command frames sent to the controller.

use bytes::Bytes;

use crate::error::{RackError, Result};
use super::codec::encode_command;

/// Lowest addressable aisle
pub const MIN_AISLE: u16 = 1;

/// Highest addressable aisle
pub const MAX_AISLE: u16 = 19;

/// Operation codes carried in `param2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum OperationCode {
    OpenAisle = 0x0001,
    RequestStatus = 0x0002,
}

/// What a command frame asks the controller to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `(0, 2)`
    RequestStatus,

    /// `(aisle, 1)` with aisle in `1..=19`
    OpenAisle(u16),

    /// Any other parameter pair
    Unknown { param1: u16, param2: u16 },
}

/// A command frame: two 16-bit words, `param1 || param2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    param1: u16,
    param2: u16,
}

impl CommandFrame {
    /// Build a frame from raw parameters (no range checks)
    pub fn new(param1: u16, param2: u16) -> Self {
        Self { param1, param2 }
    }

    /// The status request `(0, 2)`
    pub fn status_request() -> Self {
        Self::new(0, OperationCode::RequestStatus as u16)
    }

    /// Open an aisle: `(aisle, 1)`
    ///
    /// Fails with `InvalidArgument` unless `aisle` is in `1..=19`.
    pub fn open_aisle(aisle: u16) -> Result<Self> {
        if !(MIN_AISLE..=MAX_AISLE).contains(&aisle) {
            return Err(RackError::InvalidArgument(format!(
                "aisle {} out of range {}..={}",
                aisle, MIN_AISLE, MAX_AISLE
            )));
        }
        Ok(Self::new(aisle, OperationCode::OpenAisle as u16))
    }

    pub fn param1(&self) -> u16 {
        self.param1
    }

    pub fn param2(&self) -> u16 {
        self.param2
    }

    /// Wire bytes for this frame
    pub fn to_bytes(&self) -> Bytes {
        encode_command(self.param1, self.param2)
    }

    /// Classify the frame
    pub fn operation(&self) -> Operation {
        match (self.param1, self.param2) {
            (0, p2) if p2 == OperationCode::RequestStatus as u16 => Operation::RequestStatus,
            (aisle, p2)
                if p2 == OperationCode::OpenAisle as u16
                    && (MIN_AISLE..=MAX_AISLE).contains(&aisle) =>
            {
                Operation::OpenAisle(aisle)
            }
            (param1, param2) => Operation::Unknown { param1, param2 },
        }
    }
}
