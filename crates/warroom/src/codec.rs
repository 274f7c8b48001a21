//! Token codec: base-62 integers and the dot-separated grid token.
//!
//! A placement packs into one integer, `slot_id * 101 + player_number`, which is
//! written in base 62 with the alphabet `0-9a-zA-Z`. The token is the list of
//! those codes for every occupied cell, joined by `.`.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::entity::{Directory, MAX_PLAYER_NUMBER};
use crate::grid::{Grid, SlotRef};

pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const RADIX: u64 = ALPHABET.len() as u64;
pub const PAIRING_RADIX: u64 = MAX_PLAYER_NUMBER as u64 + 1;
pub const SEPARATOR: char = '.';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("empty code")]
    EmptyCode,
    #[error("invalid character '{ch}' at position {position} in code '{code}'")]
    InvalidCharacter {
        code: String,
        ch: char,
        position: usize,
    },
    #[error("code '{code}' does not fit in 64 bits")]
    Overflow { code: String },
}

pub fn encode_integer(mut n: u64) -> String {
    if n == 0 {
        return (ALPHABET[0] as char).to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ALPHABET[(n % RADIX) as usize]);
        n /= RADIX;
    }
    digits.iter().rev().map(|b| *b as char).collect()
}

pub fn decode_integer(code: &str) -> Result<u64, CodecError> {
    if code.is_empty() {
        return Err(CodecError::EmptyCode);
    }
    let mut value = 0u64;
    for (position, ch) in code.chars().enumerate() {
        let digit = digit_value(ch).ok_or_else(|| CodecError::InvalidCharacter {
            code: code.to_string(),
            ch,
            position,
        })?;
        value = value
            .checked_mul(RADIX)
            .and_then(|v| v.checked_add(digit))
            .ok_or_else(|| CodecError::Overflow {
                code: code.to_string(),
            })?;
    }
    Ok(value)
}

fn digit_value(ch: char) -> Option<u64> {
    match ch {
        '0'..='9' => Some(ch as u64 - '0' as u64),
        'a'..='z' => Some(ch as u64 - 'a' as u64 + 10),
        'A'..='Z' => Some(ch as u64 - 'A' as u64 + 36),
        _ => None,
    }
}

/// Pairs a slot with a player number. Player numbers outside `1..=100` make
/// the pairing ambiguous; directory loading rejects them before they get here.
pub fn pack(slot: SlotRef, player_number: u32) -> u64 {
    slot.slot_id() as u64 * PAIRING_RADIX + u64::from(player_number)
}

/// Splits a packed code into `(slot_id, player_number)`. The slot id is not
/// range-checked.
pub fn unpack(packed: u64) -> (u64, u32) {
    (packed / PAIRING_RADIX, (packed % PAIRING_RADIX) as u32)
}

pub fn encode_grid(grid: &Grid) -> String {
    let mut token = String::new();
    for (slot, entity) in grid.occupied() {
        if !token.is_empty() {
            token.push(SEPARATOR);
        }
        token.push_str(&encode_integer(pack(slot, entity.player_number)));
    }
    token
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    UnknownPlayer,
    SlotOutOfRange,
    SlotTaken,
    AlreadyPlaced,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSegment {
    pub segment: String,
    pub slot_id: u64,
    pub player_number: u32,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGrid {
    pub grid: Grid,
    pub placed: usize,
    pub skipped: Vec<SkippedSegment>,
}

/// Strict form of [`decode_grid`]: segment-level conflicts are collected in
/// `skipped`, but a segment that is not a base-62 number fails the whole call.
pub fn try_decode_grid(token: &str, directory: &Directory) -> Result<DecodedGrid, CodecError> {
    let mut decoded = DecodedGrid {
        grid: Grid::empty(),
        placed: 0,
        skipped: Vec::new(),
    };
    let mut placed_ids = HashSet::new();

    for segment in token.split(SEPARATOR).filter(|s| !s.is_empty()) {
        let (slot_id, player_number) = unpack(decode_integer(segment)?);
        let reason = match (
            directory.by_player_number(player_number),
            usize::try_from(slot_id).ok().and_then(SlotRef::from_slot_id),
        ) {
            (None, _) => Some(SkipReason::UnknownPlayer),
            (Some(_), None) => Some(SkipReason::SlotOutOfRange),
            (Some(_), Some(slot)) if !decoded.grid.is_empty_at(slot) => {
                Some(SkipReason::SlotTaken)
            }
            (Some(entity), Some(_)) if placed_ids.contains(&entity.id) => {
                Some(SkipReason::AlreadyPlaced)
            }
            (Some(entity), Some(slot)) => {
                placed_ids.insert(entity.id.clone());
                decoded.grid.set(slot, entity.clone());
                decoded.placed += 1;
                None
            }
        };
        if let Some(reason) = reason {
            debug!(segment, slot_id, player_number, ?reason, "token_segment_skipped");
            decoded.skipped.push(SkippedSegment {
                segment: segment.to_string(),
                slot_id,
                player_number,
                reason,
            });
        }
    }

    Ok(decoded)
}

/// Best-effort decode. Never fails: a malformed token yields an empty grid.
pub fn decode_grid(token: &str, directory: &Directory) -> Grid {
    if token.is_empty() {
        return Grid::empty();
    }
    match try_decode_grid(token, directory) {
        Ok(decoded) => decoded.grid,
        Err(error) => {
            warn!(token, error = %error, "token_decode_failed");
            Grid::empty()
        }
    }
}
