//! Signal sources
//!
//! The translator never decodes CAN itself. It asks a [`SignalSource`] per bus
//! for the latest value of `message.signal`. This module defines that seam,
//! a plain in-memory source, and (in submodules) a DBC-backed parser.

pub mod can_parser;
pub mod database;
pub mod dbc;

use crate::types::{CarStateError, Channel, Result};
use std::collections::HashMap;

pub use can_parser::{CanFrame, CanParser};
pub use database::{MessageDefinition, SignalDatabase, SignalDefinition};

/// Latest decoded values of one bus
pub trait SignalSource {
    /// Bus this source reads
    fn channel(&self) -> Channel;

    /// Last known value of `message.signal`.
    ///
    /// Must fail with [`CarStateError::SignalUnavailable`] rather than
    /// substitute a default when the value has never been decoded.
    fn value(&self, message: &str, signal: &str) -> Result<f64>;
}

/// The three bus sources for one cycle
#[derive(Clone, Copy)]
pub struct Buses<'a> {
    pub pt: &'a dyn SignalSource,
    pub radar: &'a dyn SignalSource,
    pub cam: &'a dyn SignalSource,
}

impl<'a> Buses<'a> {
    pub fn new(
        pt: &'a dyn SignalSource,
        radar: &'a dyn SignalSource,
        cam: &'a dyn SignalSource,
    ) -> Self {
        Self { pt, radar, cam }
    }

    /// Source for a given bus
    pub fn source(&self, channel: Channel) -> &'a dyn SignalSource {
        match channel {
            Channel::Powertrain => self.pt,
            Channel::Radar => self.radar,
            Channel::Camera => self.cam,
        }
    }

    /// Value of `message.signal` on `channel`
    pub fn value(&self, channel: Channel, message: &str, signal: &str) -> Result<f64> {
        self.source(channel).value(message, signal)
    }
}

/// In-memory source holding values set by the caller
#[derive(Debug, Clone)]
pub struct SignalSnapshot {
    channel: Channel,
    values: HashMap<(String, String), f64>,
}

impl SignalSnapshot {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            values: HashMap::new(),
        }
    }

    /// Set (or overwrite) the value of `message.signal`
    pub fn set(&mut self, message: &str, signal: &str, value: f64) {
        self.values
            .insert((message.to_string(), signal.to_string()), value);
    }

    /// Builder form of [`SignalSnapshot::set`]
    pub fn with(mut self, message: &str, signal: &str, value: f64) -> Self {
        self.set(message, signal, value);
        self
    }

    /// Drop a value so later lookups report it as unavailable
    pub fn remove(&mut self, message: &str, signal: &str) {
        self.values
            .remove(&(message.to_string(), signal.to_string()));
    }
}

impl SignalSource for SignalSnapshot {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn value(&self, message: &str, signal: &str) -> Result<f64> {
        self.values
            .get(&(message.to_string(), signal.to_string()))
            .copied()
            .ok_or_else(|| CarStateError::unavailable(self.channel, message, signal))
    }
}
