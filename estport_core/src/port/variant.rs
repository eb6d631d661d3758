// estport_core/src/port/variant.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PortError, PortResult};
use crate::port::PortBuffers;

/// Selects how Step threads time into the descriptor.
///
/// Both variants share one Step signature (observation + timestamp in, state
/// out); only the clock bookkeeping differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PortVariant {
    /// The descriptor clock ticks by `Intervel` per step; record times are
    /// only carried through to the results.
    ValueOnly,
    /// Record timestamps drive `ObservationTimestamp` and `CurrentTimestamp`.
    #[default]
    Timestamped,
}

impl PortVariant {
    /// Discriminant carried across the module ABI.
    pub fn as_raw(self) -> u32 {
        match self {
            PortVariant::ValueOnly => 0,
            PortVariant::Timestamped => 1,
        }
    }

    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(PortVariant::ValueOnly),
            1 => Some(PortVariant::Timestamped),
            _ => None,
        }
    }

    /// Works out the descriptor time for the next step without touching it.
    /// A timestamp that runs backwards is rejected here, before any buffer changes.
    pub fn resolve_timestamp(self, port: &PortBuffers, timestamp: f64) -> PortResult<f64> {
        match self {
            PortVariant::ValueOnly => Ok(port.steps as f64 * port.config.interval),
            PortVariant::Timestamped => {
                if !timestamp.is_finite() {
                    return Err(PortError::NonMonotonicTimestamp {
                        timestamp,
                        previous: port.current_timestamp,
                    });
                }
                if port.steps > 0 && timestamp < port.current_timestamp {
                    return Err(PortError::NonMonotonicTimestamp {
                        timestamp,
                        previous: port.current_timestamp,
                    });
                }
                Ok(timestamp)
            }
        }
    }

    /// Stamps an accepted observation time onto the descriptor.
    pub fn stamp_observation(self, port: &mut PortBuffers, now: f64) {
        port.observation_timestamp = now;
        port.current_timestamp = now;
    }
}

impl fmt::Display for PortVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortVariant::ValueOnly => write!(f, "value-only"),
            PortVariant::Timestamped => write!(f, "timestamped"),
        }
    }
}

impl FromStr for PortVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value-only" => Ok(PortVariant::ValueOnly),
            "timestamped" => Ok(PortVariant::Timestamped),
            other => Err(format!(
                "unknown port variant '{other}' (expected 'value-only' or 'timestamped')"
            )),
        }
    }
}
