//! Maps `Box<dyn Error>` from trait boundaries to typed `SumoError`.
//!
//! The traits in `sumo_traits` use `Box<dyn Error + Send + Sync>`; this module
//! converts those to our typed error enum, with an optional feature-gated
//! path for `sumo_hardware::HwError` downcasting.

use crate::error::SumoError;

/// Map a trait-boundary error to a typed `SumoError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> SumoError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<sumo_hardware::error::HwError>() {
            return match hw {
                sumo_hardware::error::HwError::Timeout => SumoError::Timeout,
                other => SumoError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        SumoError::Timeout
    } else {
        SumoError::Hardware(s)
    }
}
