//! Observation-only data kept by the translator
//!
//! Neither struct feeds any decision in this crate. They are overwritten every
//! cycle and exposed read-only for debugging and for relaying to the camera.

use serde::Serialize;

/// Last `byte03` of each ECU's diagnostic response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticSnapshot {
    /// Camera (forward sensing module)
    pub fsm_resp: u8,
    /// Central electronic module
    pub cem_resp: u8,
    /// Power steering control module
    pub pscm_resp: u8,
    /// Collision avoidance module
    pub cvm_resp: u8,
}

/// Raw PSCM1 fields relayed downstream.
///
/// The camera cross-checks `LKAActive` and torque against what it requested,
/// so these are forwarded untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ActuatorRelay {
    pub byte0: u8,
    pub byte4: u8,
    pub byte7: u8,
    pub lka_active: u8,
    pub steering_wheel_rate_of_change: f64,
    pub steering_rate_deg: f64,
}

/// Raw byte-wide signal value; decoded bytes are integral and within 0..=255
pub(crate) fn raw_byte(value: f64) -> u8 {
    value.clamp(0.0, u8::MAX as f64) as u8
}
