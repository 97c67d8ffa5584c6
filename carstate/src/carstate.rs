//! Per-cycle translation of bus signals into a [`VehicleState`]
//!
//! [`CarState`] is the one capability a vehicle port has to provide. The
//! shared pieces (edge detection, cruise classification, servo fault
//! monitoring, speed estimation) live in their own modules and are composed
//! here.

use crate::buttons::ButtonEdgeDetector;
use crate::config::CarParams;
use crate::cruise;
use crate::diag::{raw_byte, ActuatorRelay, DiagnosticSnapshot};
use crate::estimator::{KalmanSpeedEstimator, SpeedEstimator};
use crate::fault::SteeringFaultMonitor;
use crate::signals::{Buses, SignalSource};
use crate::types::{GearShifter, Result, VehicleState};

/// Below this raw speed (m/s) the car is at standstill
const STANDSTILL_SPEED: f64 = 0.1;

/// Normalized accelerator deadband
const GAS_PRESSED_THRESHOLD: f64 = 0.1;

const TURN_SIGNAL_LEFT: f64 = 1.0;
const TURN_SIGNAL_RIGHT: f64 = 3.0;

/// Produces one [`VehicleState`] per control cycle
pub trait CarState {
    /// Read this cycle's signals and advance internal state.
    ///
    /// Call exactly once per cycle; timing-based detectors assume a constant
    /// call rate.
    fn update(&mut self, buses: &Buses<'_>) -> Result<VehicleState>;
}

/// Everything read from the buses in one cycle
struct CycleInputs {
    vehicle_speed: f64,
    steering_angle: f64,
    steering_torque: f64,
    cc_buttons_held: bool,
    acc_pedal: f64,
    acc_status: i64,
    turn_signal: f64,
    buttons: Vec<bool>,
    diag: DiagnosticSnapshot,
    relay: ActuatorRelay,
}

impl CycleInputs {
    fn read(buses: &Buses<'_>, params: &CarParams) -> Result<Self> {
        let pt = buses.pt;
        let cam = buses.cam;

        let mut cc_buttons_held = false;
        for signal in ["ACCSetBtn", "ACCMinusBtn", "ACCResumeBtn"] {
            cc_buttons_held |= pt.value("CCButtons", signal)? != 0.0;
        }

        let buttons = params
            .buttons
            .iter()
            .map(|b| Ok(b.is_pressed(buses.value(b.channel, &b.message, &b.signal)?)))
            .collect::<Result<Vec<bool>>>()?;

        let diag = DiagnosticSnapshot {
            fsm_resp: raw_byte(cam.value("diagFSMResp", "byte03")?),
            cem_resp: raw_byte(pt.value("diagCEMResp", "byte03")?),
            pscm_resp: raw_byte(pt.value("diagPSCMResp", "byte03")?),
            cvm_resp: raw_byte(pt.value("diagCVMResp", "byte03")?),
        };

        let rate_of_change = pt.value("PSCM1", "SteeringWheelRateOfChange")?;
        let relay = ActuatorRelay {
            byte0: raw_byte(pt.value("PSCM1", "byte0")?),
            byte4: raw_byte(pt.value("PSCM1", "byte4")?),
            byte7: raw_byte(pt.value("PSCM1", "byte7")?),
            lka_active: raw_byte(pt.value("PSCM1", "LKAActive")?),
            steering_wheel_rate_of_change: rate_of_change,
            steering_rate_deg: rate_of_change,
        };

        Ok(Self {
            vehicle_speed: pt.value("VehicleSpeed1", "VehicleSpeed")?,
            steering_angle: pt.value("PSCM1", "SteeringAngleServo")?,
            steering_torque: pt.value("PSCM1", "LKATorque")?,
            cc_buttons_held,
            acc_pedal: pt.value("AccPedal", "AccPedal")?,
            acc_status: cam.value("FSM0", "ACCStatus")? as i64,
            turn_signal: pt.value("MiscCarInfo", "TurnSignal")?,
            buttons,
            diag,
            relay,
        })
    }
}

/// Volvo EUCD car state
#[derive(Debug)]
pub struct VolvoCarState<E = KalmanSpeedEstimator> {
    params: CarParams,
    buttons: ButtonEdgeDetector,
    fault_monitor: SteeringFaultMonitor,
    estimator: E,
    diag: DiagnosticSnapshot,
    pscm_info: ActuatorRelay,
}

impl VolvoCarState<KalmanSpeedEstimator> {
    /// Create a translator using the built-in Kalman speed estimator
    pub fn new(params: CarParams) -> Result<Self> {
        let estimator = KalmanSpeedEstimator::new(params.cycle_dt, params.speed_kf_gain);
        Self::with_estimator(params, estimator)
    }
}

impl<E: SpeedEstimator> VolvoCarState<E> {
    /// Create a translator with a caller-provided speed estimator
    pub fn with_estimator(params: CarParams, estimator: E) -> Result<Self> {
        params.validate()?;

        log::info!(
            "Volvo car state: {} buttons, fault after {} silent cycles above {:.1} m/s",
            params.buttons.len(),
            params.zero_torque_fault_cycles,
            params.min_steer_speed
        );

        Ok(Self {
            buttons: ButtonEdgeDetector::new(params.buttons.iter().map(|b| b.event_type)),
            fault_monitor: SteeringFaultMonitor::new(params.zero_torque_fault_cycles),
            estimator,
            diag: DiagnosticSnapshot::default(),
            pscm_info: ActuatorRelay::default(),
            params,
        })
    }

    pub fn params(&self) -> &CarParams {
        &self.params
    }

    /// Diagnostic bytes seen on the last cycle
    pub fn diag(&self) -> &DiagnosticSnapshot {
        &self.diag
    }

    /// Servo fields seen on the last cycle, for relaying to the camera
    pub fn actuator_relay(&self) -> &ActuatorRelay {
        &self.pscm_info
    }

    pub fn fault_monitor(&self) -> &SteeringFaultMonitor {
        &self.fault_monitor
    }

    pub fn button_detector(&self) -> &ButtonEdgeDetector {
        &self.buttons
    }
}

impl<E: SpeedEstimator> CarState for VolvoCarState<E> {
    fn update(&mut self, buses: &Buses<'_>) -> Result<VehicleState> {
        // Read everything first so a missing signal leaves state untouched
        let inputs = CycleInputs::read(buses, &self.params)?;

        let mut ret = VehicleState::default();

        // Speeds
        ret.v_ego_raw = inputs.vehicle_speed * self.params.speed_factor;
        (ret.v_ego, ret.a_ego) = self.estimator.update(ret.v_ego_raw);
        ret.standstill = ret.v_ego_raw < STANDSTILL_SPEED;

        // Steering
        ret.steering_angle_deg = inputs.steering_angle;
        ret.steering_torque = inputs.steering_torque;
        ret.steering_pressed = inputs.cc_buttons_held;

        // Gas. No brake pedal signal is decoded yet.
        ret.gas = inputs.acc_pedal / self.params.accel_full_scale;
        ret.gas_pressed = ret.gas > GAS_PRESSED_THRESHOLD;
        ret.brake_pressed = false;

        // TODO: decode the EUCD gear selector; until then always Drive
        ret.gear_shifter = GearShifter::Drive;

        // No door or seatbelt signals yet
        ret.door_open = false;
        ret.seatbelt_unlatched = false;

        ret.cruise_state = cruise::classify(
            inputs.acc_status,
            self.params.acc_ready_code,
            self.params.acc_active_threshold,
        );

        ret.button_events = self.buttons.detect(&inputs.buttons);
        ret.left_blinker = inputs.turn_signal == TURN_SIGNAL_LEFT;
        ret.right_blinker = inputs.turn_signal == TURN_SIGNAL_RIGHT;

        self.diag = inputs.diag;
        self.pscm_info = inputs.relay;

        ret.steer_fault_temporary = self.fault_monitor.update(
            ret.cruise_state.enabled,
            ret.v_ego,
            ret.steering_torque,
            self.params.min_steer_speed,
        );

        log::trace!(
            "v_ego={:.2} acc={:?} torque={} zero_torque_count={}",
            ret.v_ego,
            ret.cruise_state,
            ret.steering_torque,
            self.fault_monitor.count()
        );

        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SignalSnapshot;
    use crate::types::{ButtonEvent, ButtonType, CarStateError, Channel};

    struct Bus {
        pt: SignalSnapshot,
        radar: SignalSnapshot,
        cam: SignalSnapshot,
    }

    impl Bus {
        /// Idle car: stopped, ACC ready, everything released
        fn idle() -> Self {
            let mut pt = SignalSnapshot::new(Channel::Powertrain)
                .with("VehicleSpeed1", "VehicleSpeed", 0.0)
                .with("AccPedal", "AccPedal", 0.0)
                .with("MiscCarInfo", "TurnSignal", 0.0)
                .with("diagCEMResp", "byte03", 0.0)
                .with("diagPSCMResp", "byte03", 0.0)
                .with("diagCVMResp", "byte03", 0.0);
            for signal in [
                "SteeringAngleServo",
                "LKATorque",
                "byte0",
                "byte4",
                "byte7",
                "LKAActive",
                "SteeringWheelRateOfChange",
            ] {
                pt.set("PSCM1", signal, 0.0);
            }
            for signal in [
                "ACCOnOffBtn",
                "ACCSetBtn",
                "ACCResumeBtn",
                "ACCMinusBtn",
                "ACCStopBtn",
                "TimeGapIncreaseBtn",
                "TimeGapDecreaseBtn",
            ] {
                pt.set("CCButtons", signal, 0.0);
            }

            let cam = SignalSnapshot::new(Channel::Camera)
                .with("FSM0", "ACCStatus", 2.0)
                .with("diagFSMResp", "byte03", 0.0);

            Self {
                pt,
                radar: SignalSnapshot::new(Channel::Radar),
                cam,
            }
        }

        fn buses(&self) -> Buses<'_> {
            Buses::new(&self.pt, &self.radar, &self.cam)
        }
    }

    fn translator(min_steer_speed: f64) -> VolvoCarState {
        VolvoCarState::new(CarParams::new().with_min_steer_speed(min_steer_speed)).unwrap()
    }

    #[test]
    fn test_idle_car() {
        let bus = Bus::idle();
        let mut cs = translator(0.0);
        let state = cs.update(&bus.buses()).unwrap();

        assert!(state.standstill);
        assert_eq!(state.gear_shifter, GearShifter::Drive);
        assert!(!state.brake_pressed && !state.door_open && !state.seatbelt_unlatched);
        assert!(state.cruise_state.available);
        assert!(!state.cruise_state.enabled);
        assert!(state.button_events.is_empty());
        assert!(!state.steer_fault_temporary);
    }

    #[test]
    fn test_speed_conversion_and_standstill() {
        let mut bus = Bus::idle();
        let mut cs = translator(0.0);

        bus.pt.set("VehicleSpeed1", "VehicleSpeed", 72.0);
        let state = cs.update(&bus.buses()).unwrap();
        assert!((state.v_ego_raw - 20.0).abs() < 1e-9);
        assert!((state.v_ego - 20.0).abs() < 1e-9);
        assert!(!state.standstill);

        // Strict boundary at 0.1 m/s
        let mut params = CarParams::new();
        params.speed_factor = 1.0;
        let mut cs = VolvoCarState::new(params).unwrap();
        bus.pt.set("VehicleSpeed1", "VehicleSpeed", 0.1);
        assert!(!cs.update(&bus.buses()).unwrap().standstill);
        bus.pt.set("VehicleSpeed1", "VehicleSpeed", 0.0999);
        assert!(cs.update(&bus.buses()).unwrap().standstill);
    }

    #[test]
    fn test_gas_normalization() {
        let mut bus = Bus::idle();
        let mut cs = translator(0.0);

        bus.pt.set("AccPedal", "AccPedal", 102.3);
        let state = cs.update(&bus.buses()).unwrap();
        assert!((state.gas - 1.0).abs() < 1e-9);
        assert!(state.gas_pressed);

        bus.pt.set("AccPedal", "AccPedal", 5.0);
        let state = cs.update(&bus.buses()).unwrap();
        assert!(!state.gas_pressed);
    }

    #[test]
    fn test_cruise_states() {
        let mut bus = Bus::idle();
        let mut cs = translator(0.0);

        for (raw, available, enabled) in [(2.0, true, false), (7.0, true, true), (0.0, false, false)] {
            bus.cam.set("FSM0", "ACCStatus", raw);
            let state = cs.update(&bus.buses()).unwrap();
            assert_eq!(state.cruise_state.available, available, "status {}", raw);
            assert_eq!(state.cruise_state.enabled, enabled, "status {}", raw);
        }
    }

    #[test]
    fn test_blinkers() {
        let mut bus = Bus::idle();
        let mut cs = translator(0.0);

        for (code, left, right) in [(1.0, true, false), (3.0, false, true), (0.0, false, false), (2.0, false, false)] {
            bus.pt.set("MiscCarInfo", "TurnSignal", code);
            let state = cs.update(&bus.buses()).unwrap();
            assert_eq!((state.left_blinker, state.right_blinker), (left, right), "code {}", code);
        }
    }

    #[test]
    fn test_button_events_and_steering_pressed() {
        let mut bus = Bus::idle();
        let mut cs = translator(0.0);

        bus.pt.set("CCButtons", "ACCSetBtn", 1.0);
        let state = cs.update(&bus.buses()).unwrap();
        assert!(state.steering_pressed);
        // ACCSetBtn drives both setCruise and accelCruise rows
        assert_eq!(
            state.button_events,
            vec![
                ButtonEvent { button: ButtonType::SetCruise, pressed: true },
                ButtonEvent { button: ButtonType::AccelCruise, pressed: true },
            ]
        );

        let state = cs.update(&bus.buses()).unwrap();
        assert!(state.button_events.is_empty());

        bus.pt.set("CCButtons", "ACCSetBtn", 0.0);
        bus.pt.set("CCButtons", "ACCStopBtn", 1.0);
        let state = cs.update(&bus.buses()).unwrap();
        assert!(!state.steering_pressed);
        assert_eq!(state.button_events.len(), 3);
        assert_eq!(state.button_events[2], ButtonEvent { button: ButtonType::Cancel, pressed: true });
    }

    #[test]
    fn test_diagnostics_and_relay_are_copied() {
        let mut bus = Bus::idle();
        let mut cs = translator(0.0);

        bus.cam.set("diagFSMResp", "byte03", 0x11 as f64);
        bus.pt.set("diagCEMResp", "byte03", 0x22 as f64);
        bus.pt.set("diagPSCMResp", "byte03", 0x33 as f64);
        bus.pt.set("diagCVMResp", "byte03", 0x44 as f64);
        bus.pt.set("PSCM1", "byte0", 5.0);
        bus.pt.set("PSCM1", "LKAActive", 1.0);
        bus.pt.set("PSCM1", "SteeringWheelRateOfChange", -12.5);
        cs.update(&bus.buses()).unwrap();

        assert_eq!(
            *cs.diag(),
            DiagnosticSnapshot { fsm_resp: 0x11, cem_resp: 0x22, pscm_resp: 0x33, cvm_resp: 0x44 }
        );
        let relay = cs.actuator_relay();
        assert_eq!(relay.byte0, 5);
        assert_eq!(relay.lka_active, 1);
        assert_eq!(relay.steering_wheel_rate_of_change, -12.5);
        assert_eq!(relay.steering_rate_deg, -12.5);
    }

    #[test]
    fn test_missing_signal_is_reported_and_state_untouched() {
        let mut bus = Bus::idle();
        let mut cs = translator(0.0);

        bus.pt.set("CCButtons", "ACCSetBtn", 1.0);
        bus.pt.remove("PSCM1", "LKATorque");
        match cs.update(&bus.buses()) {
            Err(CarStateError::SignalUnavailable { channel, message, signal }) => {
                assert_eq!(channel, Channel::Powertrain);
                assert_eq!(message, "PSCM1");
                assert_eq!(signal, "LKATorque");
            }
            other => panic!("expected unavailable signal, got {:?}", other),
        }
        assert_eq!(cs.button_detector().is_pressed(1), Some(false));
    }

    #[test]
    fn test_servo_silence_raises_fault() {
        let mut bus = Bus::idle();
        let mut cs = translator(5.0);

        bus.pt.set("VehicleSpeed1", "VehicleSpeed", 72.0);
        bus.cam.set("FSM0", "ACCStatus", 6.0);

        for _ in 0..999 {
            assert!(!cs.update(&bus.buses()).unwrap().steer_fault_temporary);
        }
        assert!(cs.update(&bus.buses()).unwrap().steer_fault_temporary);

        bus.pt.set("PSCM1", "LKATorque", 1.0);
        assert!(!cs.update(&bus.buses()).unwrap().steer_fault_temporary);
        assert_eq!(cs.fault_monitor().count(), 0);
    }

    #[test]
    fn test_no_fault_below_min_steer_speed() {
        let mut bus = Bus::idle();
        let mut cs = translator(5.0);

        bus.pt.set("VehicleSpeed1", "VehicleSpeed", 10.0);
        bus.cam.set("FSM0", "ACCStatus", 6.0);
        for _ in 0..1500 {
            assert!(!cs.update(&bus.buses()).unwrap().steer_fault_temporary);
        }
        assert_eq!(cs.fault_monitor().count(), 0);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = CarParams::new().with_zero_torque_fault_cycles(0);
        assert!(VolvoCarState::new(params).is_err());
    }
}
