//! DBC file loading
//!
//! Converts Vector DBC definitions (via `can-dbc`) into [`MessageDefinition`]s.

use crate::signals::database::{ByteOrder, MessageDefinition, SignalDefinition, ValueType};
use crate::types::{CarStateError, Result};
use std::path::Path;

/// can-dbc keeps the extended-frame flag in bit 31 of the message id
const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

/// Parse a DBC file and return its message definitions
pub fn parse_dbc_file(path: &Path) -> Result<Vec<MessageDefinition>> {
    log::info!("Parsing DBC file: {:?}", path);

    let bytes = std::fs::read(path)?;

    // DBC files from vendor tools are frequently Latin-1
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("DBC file {:?} is not UTF-8, reading as Latin-1", path);
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    let messages = parse_dbc_str(&content)?;
    log::info!("Parsed {} messages from {:?}", messages.len(), path);
    Ok(messages)
}

/// Parse DBC text and return its message definitions
pub fn parse_dbc_str(content: &str) -> Result<Vec<MessageDefinition>> {
    let dbc = can_dbc::DBC::from_slice(content.as_bytes())
        .map_err(|e| CarStateError::DbcParseError(format!("{:?}", e)))?;

    Ok(dbc.messages().iter().map(convert_message).collect())
}

fn convert_message(dbc_msg: &can_dbc::Message) -> MessageDefinition {
    let multiplexer_signal = dbc_msg
        .signals()
        .iter()
        .find(|s| matches!(s.multiplexer_indicator(), can_dbc::MultiplexIndicator::Multiplexor))
        .map(|s| s.name().to_string());

    MessageDefinition {
        id: dbc_msg.message_id().0 & CAN_EFF_MASK,
        name: dbc_msg.message_name().to_string(),
        size: *dbc_msg.message_size() as usize,
        signals: dbc_msg.signals().iter().map(convert_signal).collect(),
        multiplexer_signal,
    }
}

fn convert_signal(dbc_sig: &can_dbc::Signal) -> SignalDefinition {
    let byte_order = match *dbc_sig.byte_order() {
        can_dbc::ByteOrder::LittleEndian => ByteOrder::LittleEndian,
        can_dbc::ByteOrder::BigEndian => ByteOrder::BigEndian,
    };

    let value_type = match *dbc_sig.value_type() {
        can_dbc::ValueType::Signed => ValueType::Signed,
        can_dbc::ValueType::Unsigned => ValueType::Unsigned,
    };

    let multiplexer_value = match *dbc_sig.multiplexer_indicator() {
        can_dbc::MultiplexIndicator::MultiplexedSignal(switch_value) => Some(switch_value),
        _ => None,
    };

    SignalDefinition {
        name: dbc_sig.name().to_string(),
        start_bit: *dbc_sig.start_bit() as u16,
        length: *dbc_sig.signal_size() as u16,
        byte_order,
        value_type,
        factor: *dbc_sig.factor(),
        offset: *dbc_sig.offset(),
        multiplexer_value,
    }
}
