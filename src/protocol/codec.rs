//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Command Format (client -> controller)
//! ```text
//! ┌──────────────┬──────────────┐
//! │ param1 (2 LE)│ param2 (2 LE)│
//! └──────────────┴──────────────┘
//! ```
//!
//! ### Status Format (controller -> client)
//! ```text
//! ┌─────────┬─────────┬─────┬─────────┐
//! │ w0 (2)  │ w1 (2)  │ ... │ w9 (2)  │   ten little-endian u16 words
//! └─────────┴─────────┴─────┴─────────┘
//! ```
//!
//! The wire is always little-endian. `Buf::get_u16_le` / `BufMut::put_u16_le`
//! swap on big-endian hosts; everything outside this file works with
//! host-native integers.

use std::io::{Read, Write};
use std::sync::Arc;
use std::time::SystemTime;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{RackError, Result};
use super::{CommandFrame, FieldLayout, StatusFrame};

/// Command frame size: two u16 words
pub const COMMAND_FRAME_LEN: usize = 4;

/// Status frame size: ten u16 words
pub const STATUS_FRAME_LEN: usize = 20;

/// Number of words in a status frame
pub const STATUS_WORD_COUNT: usize = STATUS_FRAME_LEN / 2;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: param1 (2, LE) + param2 (2, LE). No range checks.
pub fn encode_command(param1: u16, param2: u16) -> Bytes {
    let mut buf = BytesMut::with_capacity(COMMAND_FRAME_LEN);
    buf.put_u16_le(param1);
    buf.put_u16_le(param2);
    buf.freeze()
}

/// Decode a command from exactly 4 bytes
pub fn decode_command(bytes: &[u8]) -> Result<CommandFrame> {
    if bytes.len() != COMMAND_FRAME_LEN {
        return Err(RackError::MalformedFrame {
            len: bytes.len(),
            expected: COMMAND_FRAME_LEN,
        });
    }

    let mut buf = bytes;
    let param1 = buf.get_u16_le();
    let param2 = buf.get_u16_le();
    Ok(CommandFrame::new(param1, param2))
}

// =============================================================================
// Status Encoding/Decoding
// =============================================================================

/// Encode ten host-native words to a 20-byte status frame
pub fn encode_status(words: &[u16; STATUS_WORD_COUNT]) -> Bytes {
    let mut buf = BytesMut::with_capacity(STATUS_FRAME_LEN);
    for &word in words {
        buf.put_u16_le(word);
    }
    buf.freeze()
}

/// Decode the ten words of a status frame
///
/// Fails with `MalformedFrame` unless `bytes` is exactly 20 bytes long.
pub fn decode_words(bytes: &[u8]) -> Result<[u16; STATUS_WORD_COUNT]> {
    if bytes.len() != STATUS_FRAME_LEN {
        return Err(RackError::MalformedFrame {
            len: bytes.len(),
            expected: STATUS_FRAME_LEN,
        });
    }

    let mut buf = bytes;
    let mut words = [0u16; STATUS_WORD_COUNT];
    for word in words.iter_mut() {
        *word = buf.get_u16_le();
    }
    Ok(words)
}

/// Decode a status frame, stamped with the current time
pub fn decode_status(bytes: &[u8], layout: &Arc<FieldLayout>) -> Result<StatusFrame> {
    decode_status_at(bytes, layout, SystemTime::now())
}

/// Decode a status frame with an explicit capture time
pub fn decode_status_at(
    bytes: &[u8],
    layout: &Arc<FieldLayout>,
    captured_at: SystemTime,
) -> Result<StatusFrame> {
    let words = decode_words(bytes)?;
    Ok(StatusFrame::new(words, Arc::clone(layout), captured_at))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete command from a stream
///
/// Blocks until 4 bytes are received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<CommandFrame> {
    let mut frame = [0u8; COMMAND_FRAME_LEN];
    reader
        .read_exact(&mut frame)
        .map_err(|e| RackError::connection("read command", e))?;
    decode_command(&frame)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &CommandFrame) -> Result<()> {
    let bytes = encode_command(command.param1(), command.param2());
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| RackError::connection("write command", e))
}

/// Write a status frame to a stream
pub fn write_status<W: Write>(writer: &mut W, words: &[u16; STATUS_WORD_COUNT]) -> Result<()> {
    let bytes = encode_status(words);
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| RackError::connection("write status", e))
}
