//! Message definitions loaded from a DBC file
//!
//! Indexed by name, since message tables refer to messages by name. Each
//! parser builds its own id index over the messages it tracks.

use std::collections::HashMap;

/// A CAN message definition
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// CAN message ID
    pub id: u32,
    /// Message name
    pub name: String,
    /// Message size in bytes
    pub size: usize,
    /// All signals in this message
    pub signals: Vec<SignalDefinition>,
    /// Multiplexer signal name (if multiplexed)
    pub multiplexer_signal: Option<String>,
}

impl MessageDefinition {
    /// Look up a signal by name
    pub fn signal(&self, name: &str) -> Option<&SignalDefinition> {
        self.signals.iter().find(|s| s.name == name)
    }
}

/// A CAN signal definition
#[derive(Debug, Clone)]
pub struct SignalDefinition {
    pub name: String,
    /// Start bit in DBC numbering (LSB for Intel, MSB for Motorola)
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    pub byte_order: ByteOrder,
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Multiplexer value this signal is active for (None if not multiplexed)
    pub multiplexer_value: Option<u64>,
}

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Signed,
    Unsigned,
}

/// Message definitions from one or more DBC files
#[derive(Debug, Default)]
pub struct SignalDatabase {
    messages: Vec<MessageDefinition>,
    by_name: HashMap<String, usize>,
}

impl SignalDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message definition. A later definition with the same name
    /// replaces the earlier one in the lookup.
    pub fn add_message(&mut self, message: MessageDefinition) {
        let idx = self.messages.len();
        if self.by_name.insert(message.name.clone(), idx).is_some() {
            log::warn!("Message {} defined more than once, using latest", message.name);
        }
        self.messages.push(message);
    }

    pub fn get_message_by_name(&self, name: &str) -> Option<&MessageDefinition> {
        self.by_name.get(name).map(|&idx| &self.messages[idx])
    }

    pub fn num_messages(&self) -> usize {
        self.by_name.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torque_message() -> MessageDefinition {
        MessageDefinition {
            id: 0x0B0,
            name: "PSCM1".to_string(),
            size: 8,
            signals: vec![SignalDefinition {
                name: "LKATorque".to_string(),
                start_bit: 0,
                length: 12,
                byte_order: ByteOrder::LittleEndian,
                value_type: ValueType::Unsigned,
                factor: 1.0,
                offset: 0.0,
                multiplexer_value: None,
            }],
            multiplexer_signal: None,
        }
    }

    #[test]
    fn test_empty_database() {
        let db = SignalDatabase::new();
        assert_eq!(db.num_messages(), 0);
        assert!(db.get_message_by_name("PSCM1").is_none());
    }

    #[test]
    fn test_lookup_by_name() {
        let mut db = SignalDatabase::new();
        db.add_message(torque_message());

        assert_eq!(db.num_messages(), 1);
        let msg = db.get_message_by_name("PSCM1").unwrap();
        assert_eq!(msg.id, 0x0B0);
        assert_eq!(msg.signal("LKATorque").unwrap().length, 12);
        assert!(msg.signal("Missing").is_none());
    }

    #[test]
    fn test_redefinition_replaces_earlier() {
        let mut db = SignalDatabase::new();
        db.add_message(torque_message());
        let mut moved = torque_message();
        moved.id = 0x0B1;
        db.add_message(moved);

        assert_eq!(db.num_messages(), 1);
        assert_eq!(db.get_message_by_name("PSCM1").unwrap().id, 0x0B1);
    }
}
