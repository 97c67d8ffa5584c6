//! Car parameter types
//!
//! Everything vehicle-specific the translator needs: thresholds, the button
//! table and the per-bus message tables used to build signal sources. Defaults
//! describe the Volvo EUCD platform.

use crate::types::{ButtonType, CarStateError, Channel, Result};
use serde::{Deserialize, Serialize};

/// km/h to m/s
pub const KPH_TO_MS: f64 = 1.0 / 3.6;

/// Configuration for the car-state translator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarParams {
    /// Below this speed (m/s) the steering servo is not expected to respond
    #[serde(default)]
    pub min_steer_speed: f64,

    /// Raw accelerator pedal reading at full travel
    #[serde(default = "default_accel_full_scale")]
    pub accel_full_scale: f64,

    /// ACC status code meaning "ready but not engaged"
    #[serde(default = "default_acc_ready_code")]
    pub acc_ready_code: i64,

    /// ACC status codes at or above this value mean "engaged"
    #[serde(default = "default_acc_active_threshold")]
    pub acc_active_threshold: i64,

    /// Consecutive zero-torque cycles before the servo is flagged as silent.
    /// This is a cycle count: retune it if the cycle rate changes.
    #[serde(default = "default_zero_torque_fault_cycles")]
    pub zero_torque_fault_cycles: u32,

    /// Multiplier from the vehicle speed signal unit to m/s
    #[serde(default = "default_speed_factor")]
    pub speed_factor: f64,

    /// Control cycle period in seconds
    #[serde(default = "default_cycle_dt")]
    pub cycle_dt: f64,

    /// Steady-state Kalman gain of the speed estimator (position, velocity)
    #[serde(default = "default_speed_kf_gain")]
    pub speed_kf_gain: [f64; 2],

    /// Buttons reported as edge events, in reporting order
    #[serde(default = "default_buttons")]
    pub buttons: Vec<ButtonConfig>,

    /// Messages read from each bus
    #[serde(default)]
    pub messages: MessageTables,
}

fn default_accel_full_scale() -> f64 {
    102.3
}

fn default_acc_ready_code() -> i64 {
    2
}

fn default_acc_active_threshold() -> i64 {
    6
}

fn default_zero_torque_fault_cycles() -> u32 {
    1000
}

fn default_speed_factor() -> f64 {
    KPH_TO_MS
}

fn default_cycle_dt() -> f64 {
    0.01
}

fn default_speed_kf_gain() -> [f64; 2] {
    [0.12287673, 0.29666309]
}

fn default_buttons() -> Vec<ButtonConfig> {
    use ButtonType::*;

    [
        (AltButton1, "ACCOnOffBtn"),
        (SetCruise, "ACCSetBtn"),
        (ResumeCruise, "ACCResumeBtn"),
        (AccelCruise, "ACCSetBtn"),
        (DecelCruise, "ACCMinusBtn"),
        (Cancel, "ACCStopBtn"),
        (GapAdjustCruise, "TimeGapIncreaseBtn"),
        (GapAdjustCruise, "TimeGapDecreaseBtn"),
    ]
    .into_iter()
    .map(|(event_type, signal)| {
        ButtonConfig::new(event_type, Channel::Powertrain, "CCButtons", signal, vec![1.0])
    })
    .collect()
}

/// A logical button and where its state is read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonConfig {
    pub event_type: ButtonType,
    #[serde(default = "default_button_channel")]
    pub channel: Channel,
    pub message: String,
    pub signal: String,
    /// Raw signal values that count as "pressed"
    pub values: Vec<f64>,
}

fn default_button_channel() -> Channel {
    Channel::Powertrain
}

impl ButtonConfig {
    pub fn new(
        event_type: ButtonType,
        channel: Channel,
        message: impl Into<String>,
        signal: impl Into<String>,
        values: Vec<f64>,
    ) -> Self {
        Self {
            event_type,
            channel,
            message: message.into(),
            signal: signal.into(),
            values,
        }
    }

    /// Whether a raw signal value belongs to the accepted set
    pub fn is_pressed(&self, raw: f64) -> bool {
        self.values.iter().any(|&v| v == raw)
    }
}

/// A tracked message and its expected transmit frequency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSpec {
    pub name: String,
    /// Expected frequency in Hz; 0 disables the freshness check
    pub frequency: u32,
}

impl MessageSpec {
    pub fn new(name: impl Into<String>, frequency: u32) -> Self {
        Self {
            name: name.into(),
            frequency,
        }
    }
}

/// Message tables for the three buses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTables {
    #[serde(default = "default_pt_messages")]
    pub powertrain: Vec<MessageSpec>,
    /// Radar bus is not decoded yet
    #[serde(default)]
    pub radar: Vec<MessageSpec>,
    #[serde(default = "default_cam_messages")]
    pub camera: Vec<MessageSpec>,
}

fn default_pt_messages() -> Vec<MessageSpec> {
    [
        ("CCButtons", 100),
        ("PSCM1", 50),
        ("VehicleSpeed1", 50),
        ("MiscCarInfo", 25),
        ("diagCEMResp", 0),
        ("diagPSCMResp", 0),
        ("diagCVMResp", 0),
        ("AccPedal", 100),
        ("BrakePedal", 50),
    ]
    .into_iter()
    .map(|(name, freq)| MessageSpec::new(name, freq))
    .collect()
}

fn default_cam_messages() -> Vec<MessageSpec> {
    vec![
        MessageSpec::new("FSM0", 100),
        MessageSpec::new("FSM2", 50),
        MessageSpec::new("diagFSMResp", 0),
    ]
}

impl Default for MessageTables {
    fn default() -> Self {
        Self {
            powertrain: default_pt_messages(),
            radar: Vec::new(),
            camera: default_cam_messages(),
        }
    }
}

impl MessageTables {
    /// Message table for one bus
    pub fn for_channel(&self, channel: Channel) -> &[MessageSpec] {
        match channel {
            Channel::Powertrain => &self.powertrain,
            Channel::Radar => &self.radar,
            Channel::Camera => &self.camera,
        }
    }
}

impl Default for CarParams {
    fn default() -> Self {
        Self {
            min_steer_speed: 0.0,
            accel_full_scale: default_accel_full_scale(),
            acc_ready_code: default_acc_ready_code(),
            acc_active_threshold: default_acc_active_threshold(),
            zero_torque_fault_cycles: default_zero_torque_fault_cycles(),
            speed_factor: default_speed_factor(),
            cycle_dt: default_cycle_dt(),
            speed_kf_gain: default_speed_kf_gain(),
            buttons: default_buttons(),
            messages: MessageTables::default(),
        }
    }
}

impl CarParams {
    /// Create parameters with the Volvo defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the minimum steer-capable speed (m/s)
    pub fn with_min_steer_speed(mut self, speed: f64) -> Self {
        self.min_steer_speed = speed;
        self
    }

    /// Builder method: set the zero-torque fault threshold (cycles)
    pub fn with_zero_torque_fault_cycles(mut self, cycles: u32) -> Self {
        self.zero_torque_fault_cycles = cycles;
        self
    }

    /// Builder method: set the cruise status codes
    pub fn with_acc_codes(mut self, ready: i64, active_threshold: i64) -> Self {
        self.acc_ready_code = ready;
        self.acc_active_threshold = active_threshold;
        self
    }

    /// Builder method: replace the button table
    pub fn with_buttons(mut self, buttons: Vec<ButtonConfig>) -> Self {
        self.buttons = buttons;
        self
    }

    /// Reject parameter sets the translator cannot work with
    pub fn validate(&self) -> Result<()> {
        if !(self.accel_full_scale > 0.0) {
            return Err(CarStateError::InvalidConfig(format!(
                "accel_full_scale must be positive, got {}",
                self.accel_full_scale
            )));
        }
        if self.zero_torque_fault_cycles == 0 {
            return Err(CarStateError::InvalidConfig(
                "zero_torque_fault_cycles must be at least 1".to_string(),
            ));
        }
        if !(self.cycle_dt > 0.0) {
            return Err(CarStateError::InvalidConfig(format!(
                "cycle_dt must be positive, got {}",
                self.cycle_dt
            )));
        }
        if self.acc_ready_code >= self.acc_active_threshold {
            return Err(CarStateError::InvalidConfig(format!(
                "acc_ready_code ({}) must be below acc_active_threshold ({})",
                self.acc_ready_code, self.acc_active_threshold
            )));
        }
        if let Some(button) = self.buttons.iter().find(|b| b.values.is_empty()) {
            return Err(CarStateError::InvalidConfig(format!(
                "button {}.{} has no accepted values",
                button.message, button.signal
            )));
        }
        Ok(())
    }
}
