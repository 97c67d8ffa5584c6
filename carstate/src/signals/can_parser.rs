//! DBC-backed signal source
//!
//! A [`CanParser`] tracks a fixed table of messages on one bus. Frames are fed
//! in with [`CanParser::update`]; the latest decoded value of each signal is
//! kept along with when its message was last seen, so that staleness can be
//! reported without the translator having to know about timing.

use crate::config::MessageSpec;
use crate::signals::database::{ByteOrder, MessageDefinition, SignalDatabase, SignalDefinition, ValueType};
use crate::signals::SignalSource;
use crate::types::{CarStateError, Channel, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A message is stale after this many expected periods without a frame
const STALE_PERIODS: u64 = 10;

/// Raw CAN frame as read from a log or socket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanFrame {
    /// Timestamp in nanoseconds
    pub timestamp_ns: u64,
    /// Bus number (0 = powertrain, 1 = radar, 2 = camera)
    pub bus: u8,
    /// CAN message ID
    pub can_id: u32,
    /// Frame data bytes
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct TrackedMessage {
    definition: MessageDefinition,
    /// Stale threshold in ns, 0 = never stale
    check_threshold_ns: u64,
    last_seen_ns: Option<u64>,
    values: HashMap<String, f64>,
}

/// Latest-value store for one bus
#[derive(Debug)]
pub struct CanParser {
    channel: Channel,
    messages: Vec<TrackedMessage>,
    by_id: HashMap<u32, usize>,
    last_nanos: u64,
}

impl CanParser {
    /// Build a parser tracking `table` on `channel`.
    ///
    /// Every message in the table must exist in `db`.
    pub fn new(channel: Channel, db: &SignalDatabase, table: &[MessageSpec]) -> Result<Self> {
        let mut messages = Vec::with_capacity(table.len());
        let mut by_id = HashMap::new();

        for spec in table {
            let definition = db
                .get_message_by_name(&spec.name)
                .ok_or_else(|| CarStateError::MessageNotFound(spec.name.clone()))?
                .clone();

            let check_threshold_ns = if spec.frequency > 0 {
                1_000_000_000 / spec.frequency as u64 * STALE_PERIODS
            } else {
                0
            };

            by_id.insert(definition.id, messages.len());
            messages.push(TrackedMessage {
                definition,
                check_threshold_ns,
                last_seen_ns: None,
                values: HashMap::new(),
            });
        }

        log::debug!("CanParser on {} tracking {} messages", channel, messages.len());

        Ok(Self {
            channel,
            messages,
            by_id,
            last_nanos: 0,
        })
    }

    /// Decode every frame addressed to this bus and a tracked message.
    /// Frames whose length differs from the DBC size are dropped and leave the
    /// message untouched. Returns the number of frames consumed.
    pub fn update(&mut self, frames: &[CanFrame]) -> usize {
        let bus = self.channel.bus();
        let mut consumed = 0;

        for frame in frames.iter().filter(|f| f.bus == bus) {
            self.last_nanos = self.last_nanos.max(frame.timestamp_ns);

            let Some(&idx) = self.by_id.get(&frame.can_id) else {
                log::trace!("Untracked CAN ID 0x{:X} on {}", frame.can_id, self.channel);
                continue;
            };

            let tracked = &mut self.messages[idx];
            if frame.data.len() != tracked.definition.size {
                log::warn!(
                    "Dropped frame for {}: {} bytes, expected {}",
                    tracked.definition.name,
                    frame.data.len(),
                    tracked.definition.size
                );
                continue;
            }

            if decode_into(&frame.data, &tracked.definition, &mut tracked.values) {
                tracked.last_seen_ns = Some(frame.timestamp_ns);
                consumed += 1;
            } else {
                log::warn!("No signal of {} could be decoded", tracked.definition.name);
            }
        }

        consumed
    }

    /// Advance the parser clock without frames (for staleness checks)
    pub fn advance_to(&mut self, now_ns: u64) {
        self.last_nanos = self.last_nanos.max(now_ns);
    }

    /// Whether `name` is tracked, has been received and is not stale
    pub fn is_fresh(&self, name: &str) -> bool {
        self.messages
            .iter()
            .find(|m| m.definition.name == name)
            .is_some_and(|m| self.message_fresh(m))
    }

    /// True iff every frequency-checked message is present and fresh
    pub fn can_valid(&self) -> bool {
        self.messages
            .iter()
            .filter(|m| m.check_threshold_ns > 0)
            .all(|m| self.message_fresh(m))
    }

    fn message_fresh(&self, m: &TrackedMessage) -> bool {
        match m.last_seen_ns {
            None => false,
            Some(_) if m.check_threshold_ns == 0 => true,
            Some(seen) => self.last_nanos.saturating_sub(seen) <= m.check_threshold_ns,
        }
    }
}

impl SignalSource for CanParser {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn value(&self, message: &str, signal: &str) -> Result<f64> {
        self.messages
            .iter()
            .find(|m| m.definition.name == message)
            .and_then(|m| m.values.get(signal))
            .copied()
            .ok_or_else(|| CarStateError::unavailable(self.channel, message, signal))
    }
}

/// Decode `data` into `values`. Multiplexed signals are only written when the
/// multiplexer selects them, so they keep their last value otherwise.
fn decode_into(data: &[u8], message: &MessageDefinition, values: &mut HashMap<String, f64>) -> bool {
    let mux_value = match &message.multiplexer_signal {
        Some(name) => match message.signal(name).and_then(|s| extract_raw(data, s)) {
            Some(raw) => Some(raw as u64),
            None => return false,
        },
        None => None,
    };

    let mut any = false;
    for signal in &message.signals {
        if signal.multiplexer_value.is_some() && signal.multiplexer_value != mux_value {
            continue;
        }
        if let Some(raw) = extract_raw(data, signal) {
            values.insert(signal.name.clone(), signal.offset + signal.factor * raw as f64);
            any = true;
        }
    }
    any
}

/// Extract the raw (unscaled, sign-extended) value of a signal
fn extract_raw(data: &[u8], signal: &SignalDefinition) -> Option<i64> {
    let length = signal.length as usize;
    if length == 0 || length > 64 {
        return None;
    }

    let raw = match signal.byte_order {
        ByteOrder::LittleEndian => extract_little_endian(data, signal.start_bit as usize, length)?,
        ByteOrder::BigEndian => extract_big_endian(data, signal.start_bit as usize, length)?,
    };

    Some(match signal.value_type {
        ValueType::Unsigned => raw as i64,
        ValueType::Signed => sign_extend(raw, length),
    })
}

/// Intel byte order: start bit is the LSB, bits ascend through the frame
fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> Option<u64> {
    if (start_bit + length).div_ceil(8) > data.len() {
        return None;
    }

    let mut result = 0u64;
    for i in 0..length {
        let pos = start_bit + i;
        let bit = (data[pos / 8] >> (pos % 8)) & 0x01;
        result |= (bit as u64) << i;
    }
    Some(result)
}

/// Motorola byte order: start bit is the MSB; within a byte bits descend,
/// then continue at bit 7 of the next byte
fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> Option<u64> {
    let mut result = 0u64;
    let mut pos = start_bit;

    for i in 0..length {
        let byte = data.get(pos / 8)?;
        let bit = (byte >> (pos % 8)) & 0x01;
        result = (result << 1) | bit as u64;

        if i + 1 < length {
            pos = if pos % 8 == 0 { pos + 15 } else { pos - 1 };
        }
    }
    Some(result)
}

/// Sign-extend an N-bit two's complement value to 64 bits
fn sign_extend(value: u64, bit_length: usize) -> i64 {
    if bit_length >= 64 {
        return value as i64;
    }

    let sign_bit = 1u64 << (bit_length - 1);
    if value & sign_bit != 0 {
        (value | (!0u64 << bit_length)) as i64
    } else {
        value as i64
    }
}
