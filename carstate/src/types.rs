//! Core types for the car-state translator
//!
//! This module defines the snapshot the translator hands to the control loop
//! every cycle, along with the button/cruise/gear vocabulary and the error type
//! shared by the rest of the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for car-state operations
pub type Result<T> = std::result::Result<T, CarStateError>;

/// One of the three independent CAN buses the car is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Powertrain bus (bus 0)
    Powertrain,
    /// Radar bus (bus 1)
    Radar,
    /// Camera bus (bus 2)
    Camera,
}

impl Channel {
    /// Physical bus number used in frame logs
    pub fn bus(&self) -> u8 {
        match self {
            Channel::Powertrain => 0,
            Channel::Radar => 1,
            Channel::Camera => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Powertrain => write!(f, "pt"),
            Channel::Radar => write!(f, "radar"),
            Channel::Camera => write!(f, "cam"),
        }
    }
}

/// Errors that can occur while translating or sourcing signals
#[derive(Debug, thiserror::Error)]
pub enum CarStateError {
    #[error("Signal unavailable on {channel}: {message}.{signal}")]
    SignalUnavailable {
        channel: Channel,
        message: String,
        signal: String,
    },

    #[error("Message not found in signal database: {0}")]
    MessageNotFound(String),

    #[error("Failed to parse DBC file: {0}")]
    DbcParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CarStateError {
    /// Build a [`CarStateError::SignalUnavailable`] for the given lookup
    pub fn unavailable(channel: Channel, message: &str, signal: &str) -> Self {
        CarStateError::SignalUnavailable {
            channel,
            message: message.to_string(),
            signal: signal.to_string(),
        }
    }
}

/// Logical button event types reported to the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ButtonType {
    AccelCruise,
    DecelCruise,
    Cancel,
    SetCruise,
    ResumeCruise,
    GapAdjustCruise,
    AltButton1,
}

/// A press or release of a configured button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonEvent {
    #[serde(rename = "type")]
    pub button: ButtonType,
    pub pressed: bool,
}

/// Adaptive cruise availability as seen by the camera
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CruiseState {
    pub available: bool,
    pub enabled: bool,
}

/// Selected gear
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GearShifter {
    #[default]
    Unknown,
    Park,
    Reverse,
    Neutral,
    Drive,
}

/// Snapshot of the vehicle produced once per cycle
///
/// Every field is derived from the current cycle's signals plus state the
/// translator explicitly retains between cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleState {
    /// Unfiltered speed in m/s
    pub v_ego_raw: f64,
    /// Filtered speed in m/s
    pub v_ego: f64,
    /// Acceleration estimate in m/s²
    pub a_ego: f64,
    pub standstill: bool,

    pub steering_angle_deg: f64,
    /// Torque feedback reported by the steering servo
    pub steering_torque: f64,
    /// Driver presence heuristic, not a safety interlock
    pub steering_pressed: bool,

    /// Accelerator position, normalized to 0..1
    pub gas: f64,
    pub gas_pressed: bool,
    /// No brake pedal signal is decoded yet; always false
    pub brake_pressed: bool,

    pub gear_shifter: GearShifter,
    /// No door signal is decoded yet; always false
    pub door_open: bool,
    /// No seatbelt signal is decoded yet; always false
    pub seatbelt_unlatched: bool,

    pub cruise_state: CruiseState,
    pub left_blinker: bool,
    pub right_blinker: bool,
    pub button_events: Vec<ButtonEvent>,

    /// Steering servo has stopped returning torque while LKA is engaged
    pub steer_fault_temporary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bus_numbers() {
        assert_eq!(Channel::Powertrain.bus(), 0);
        assert_eq!(Channel::Radar.bus(), 1);
        assert_eq!(Channel::Camera.bus(), 2);
        assert_eq!(format!("{}", Channel::Camera), "cam");
    }

    #[test]
    fn test_unavailable_error_message() {
        let err = CarStateError::unavailable(Channel::Powertrain, "PSCM1", "LKATorque");
        assert_eq!(err.to_string(), "Signal unavailable on pt: PSCM1.LKATorque");
    }

    #[test]
    fn test_default_state_is_inert() {
        let state = VehicleState::default();
        assert!(!state.steer_fault_temporary);
        assert!(!state.cruise_state.available);
        assert!(state.button_events.is_empty());
        assert_eq!(state.gear_shifter, GearShifter::Unknown);
    }
}
