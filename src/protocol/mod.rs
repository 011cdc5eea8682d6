//! Protocol Module
//!
//! Pure encode/decode of the controller's fixed-size frames. No I/O state.
//!
//! ## Frames
//!
//! ### Command (4 bytes)
//! ```text
//! ┌──────────────┬──────────────┐
//! │ param1 (2 LE)│ param2 (2 LE)│
//! └──────────────┴──────────────┘
//! ```
//!
//! ### Commands
//! - `(0, 2)`:      request status
//! - `(1..=19, 1)`: open that aisle
//!
//! ### Status (20 bytes)
//! Ten little-endian u16 words at offsets 0, 2, ..., 18. Their meaning is
//! given by a [`FieldLayout`].

mod command;
mod status;
mod layout;
mod codec;

pub use command::{CommandFrame, Operation, OperationCode, MAX_AISLE, MIN_AISLE};
pub use status::{StatusFrame, StatusSnapshot};
pub use layout::{Field, FieldKind, FieldLayout};
pub use codec::{
    encode_command, decode_command,
    encode_status, decode_status, decode_status_at, decode_words,
    read_command, write_command, write_status,
    COMMAND_FRAME_LEN, STATUS_FRAME_LEN, STATUS_WORD_COUNT,
};

