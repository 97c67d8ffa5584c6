//! ACC status classification

use crate::types::CruiseState;

/// Map the camera's raw ACC status onto availability/engagement.
///
/// `ready_code` means ready but idle, anything at or above
/// `active_threshold` is engaged, and every other code (including ones this
/// car is not known to send) is treated as unavailable.
pub fn classify(raw_status: i64, ready_code: i64, active_threshold: i64) -> CruiseState {
    if raw_status == ready_code {
        CruiseState {
            available: true,
            enabled: false,
        }
    } else if raw_status >= active_threshold {
        CruiseState {
            available: true,
            enabled: true,
        }
    } else {
        log::trace!("Unclassified ACC status {}", raw_status);
        CruiseState::default()
    }
}
