//! Steering servo silence detection
//!
//! While LKA is engaged above the minimum steer speed the servo always reports
//! some torque. A run of exactly-zero torque readings means it has stopped
//! responding. The run length is counted in cycles, so the threshold is
//! `threshold / cycle_rate` seconds of silence.

/// Zero-torque run counter
#[derive(Debug, Clone)]
pub struct SteeringFaultMonitor {
    threshold: u32,
    count_zero_torque: u32,
    cruise_enabled_prev: bool,
}

impl SteeringFaultMonitor {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            count_zero_torque: 0,
            cruise_enabled_prev: false,
        }
    }

    /// Run one cycle and return the current fault flag.
    pub fn update(
        &mut self,
        cruise_enabled: bool,
        vehicle_speed: f64,
        steering_torque: f64,
        min_steer_speed: f64,
    ) -> bool {
        let mut fault = false;

        if cruise_enabled && vehicle_speed > min_steer_speed {
            // Fresh engagement, don't inherit a count from the last one
            if self.cruise_enabled_prev != cruise_enabled {
                self.count_zero_torque = 0;
            }

            if steering_torque == 0.0 {
                self.count_zero_torque += 1;
            } else {
                self.count_zero_torque = 0;
            }

            fault = self.count_zero_torque >= self.threshold;
            if fault && self.count_zero_torque == self.threshold {
                log::warn!(
                    "Steering servo silent for {} cycles, flagging temporary fault",
                    self.count_zero_torque
                );
            }
        }

        self.cruise_enabled_prev = cruise_enabled;
        fault
    }

    /// Current zero-torque run length
    pub fn count(&self) -> u32 {
        self.count_zero_torque
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
