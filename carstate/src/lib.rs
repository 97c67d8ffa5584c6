//! Volvo Car State Library
//!
//! Translates decoded CAN signals from the powertrain, radar and camera buses
//! into one [`VehicleState`] per control cycle, and watches for two runtime
//! anomalies: a driver overriding automated steering, and the steering servo
//! silently stopping to respond while lane keeping is engaged.
//!
//! # Architecture
//!
//! - [`signals::SignalSource`] is the seam to CAN decoding. Any source works;
//!   [`signals::CanParser`] is a DBC-backed one.
//! - [`carstate::CarState`] is implemented per vehicle. [`VolvoCarState`]
//!   composes the shared pieces: [`ButtonEdgeDetector`], [`cruise::classify`],
//!   [`SteeringFaultMonitor`] and a [`SpeedEstimator`].
//!
//! The translator is synchronous and does no I/O. Call it once per cycle from a
//! single thread.
//!
//! # Example Usage
//!
//! ```no_run
//! use carstate::signals::{self, Buses, CanParser, SignalDatabase};
//! use carstate::{CarParams, CarState, Channel, VolvoCarState};
//! use std::path::Path;
//!
//! let params = CarParams::new().with_min_steer_speed(8.0);
//!
//! let mut db = SignalDatabase::new();
//! for message in signals::dbc::parse_dbc_file(Path::new("volvo_v60.dbc")).unwrap() {
//!     db.add_message(message);
//! }
//!
//! let pt = CanParser::new(Channel::Powertrain, &db, &params.messages.powertrain).unwrap();
//! let radar = CanParser::new(Channel::Radar, &db, &params.messages.radar).unwrap();
//! let cam = CanParser::new(Channel::Camera, &db, &params.messages.camera).unwrap();
//!
//! let mut car = VolvoCarState::new(params).unwrap();
//! // ... feed frames into the parsers, then once per cycle:
//! let state = car.update(&Buses::new(&pt, &radar, &cam)).unwrap();
//! println!("v_ego = {:.2} m/s", state.v_ego);
//! ```

// Public modules
pub mod buttons;
pub mod carstate;
pub mod config;
pub mod cruise;
pub mod diag;
pub mod estimator;
pub mod fault;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use buttons::ButtonEdgeDetector;
pub use carstate::{CarState, VolvoCarState};
pub use config::{ButtonConfig, CarParams, MessageSpec, MessageTables};
pub use diag::{ActuatorRelay, DiagnosticSnapshot};
pub use estimator::{KalmanSpeedEstimator, SpeedEstimator};
pub use fault::SteeringFaultMonitor;
pub use types::{
    ButtonEvent, ButtonType, CarStateError, Channel, CruiseState, GearShifter, Result,
    VehicleState,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: default parameters build a translator
        let car = VolvoCarState::new(CarParams::default()).unwrap();
        assert_eq!(car.fault_monitor().count(), 0);
        assert_eq!(car.button_detector().len(), 8);
    }
}
