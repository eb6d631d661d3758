// estport_core/src/bridge/mod.rs

//! A command-dispatch facade over one port, for hosts that can only pass
//! loosely typed arguments (a scripting console, a REPL).

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{ErrorKind, PortError};
use crate::port::EstimatorPort;

pub const ID_BAD_INPUT: &str = "EstimatorPortN:badInput";
pub const ID_TYPE: &str = "EstimatorPortN:type";
pub const ID_DIM: &str = "EstimatorPortN:dim";
pub const ID_UNKNOWN_COMMAND: &str = "EstimatorPortN:unknownCmd";
pub const ID_LIFECYCLE: &str = "EstimatorPortN:lifecycle";
pub const ID_PORT: &str = "EstimatorPortN:port";

const ESTIMATE_USAGE: &str = "Usage: estimate <observation> [timestamp].";

/// One loosely typed argument as a host would pass it.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeArg {
    Text(String),
    Scalar(f64),
    Vector(Vec<f64>),
}

impl BridgeArg {
    fn type_name(&self) -> &'static str {
        match self {
            BridgeArg::Text(_) => "text",
            BridgeArg::Scalar(_) => "scalar",
            BridgeArg::Vector(_) => "vector",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeReply {
    Flag(bool),
    Vector(Vec<f64>),
}

impl fmt::Display for BridgeReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeReply::Flag(flag) => write!(f, "{flag}"),
            BridgeReply::Vector(values) => {
                let parts: Vec<String> = values.iter().map(|v| format!("{v:.6}")).collect();
                write!(f, "[{}]", parts.join(" "))
            }
        }
    }
}

/// An error with a stable identifier the host can switch on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{id}: {message}")]
pub struct BridgeError {
    pub id: &'static str,
    pub message: String,
}

impl BridgeError {
    fn new(id: &'static str, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }
}

impl From<PortError> for BridgeError {
    fn from(err: PortError) -> Self {
        let id = match (&err, err.kind()) {
            (PortError::DimensionMismatch { .. }, _) => ID_DIM,
            (_, ErrorKind::Lifecycle) => ID_LIFECYCLE,
            _ => ID_PORT,
        };
        BridgeError::new(id, err.to_string())
    }
}

/// Owns one port and one descriptor and maps text commands onto them:
/// `initialize`, `estimate <vector> [timestamp]` and `terminate`.
#[derive(Debug)]
pub struct CommandBridge<P: EstimatorPort> {
    port: P,
    descriptor: P::Descriptor,
    terminated: bool,
    last_timestamp: f64,
}

impl<P: EstimatorPort> CommandBridge<P> {
    pub fn new(port: P) -> Self {
        let descriptor = port.new_descriptor();
        Self {
            port,
            descriptor,
            terminated: false,
            last_timestamp: 0.0,
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn descriptor(&self) -> &P::Descriptor {
        &self.descriptor
    }

    /// `args[0]` names the command; the rest are its operands.
    pub fn dispatch(&mut self, args: &[BridgeArg]) -> Result<BridgeReply, BridgeError> {
        let (command, operands) = match args.split_first() {
            Some((BridgeArg::Text(command), operands)) => (command.as_str(), operands),
            Some((other, _)) => {
                return Err(BridgeError::new(
                    ID_BAD_INPUT,
                    format!("First input must be a command string, got a {}.", other.type_name()),
                ))
            }
            None => {
                return Err(BridgeError::new(
                    ID_BAD_INPUT,
                    "First input must be a command string.",
                ))
            }
        };
        debug!(command, operands = operands.len(), "bridge dispatch");

        match command {
            "initialize" => {
                expect_no_operands(command, operands)?;
                self.initialize()
            }
            "estimate" => self.estimate(operands),
            "terminate" => {
                expect_no_operands(command, operands)?;
                self.port.terminate(&mut self.descriptor)?;
                self.terminated = true;
                Ok(BridgeReply::Flag(true))
            }
            other => Err(BridgeError::new(
                ID_UNKNOWN_COMMAND,
                format!("Unknown command '{other}'. Use 'initialize' | 'estimate' | 'terminate'."),
            )),
        }
    }

    fn initialize(&mut self) -> Result<BridgeReply, BridgeError> {
        // A finished session starts over on a fresh descriptor; the old one
        // stays Terminated.
        if self.terminated {
            self.descriptor = self.port.new_descriptor();
            self.terminated = false;
            self.last_timestamp = 0.0;
        }
        self.port.initialize(&mut self.descriptor)?;
        Ok(BridgeReply::Flag(true))
    }

    fn estimate(&mut self, operands: &[BridgeArg]) -> Result<BridgeReply, BridgeError> {
        let observation = match operands.first() {
            Some(BridgeArg::Vector(values)) => values.as_slice(),
            Some(BridgeArg::Scalar(value)) => std::slice::from_ref(value),
            Some(other) => {
                return Err(BridgeError::new(
                    ID_TYPE,
                    format!("Observation must be a numeric vector, got {}.", other.type_name()),
                ))
            }
            None => return Err(BridgeError::new(ID_BAD_INPUT, ESTIMATE_USAGE)),
        };
        let timestamp = match operands.get(1) {
            None => self.last_timestamp,
            Some(BridgeArg::Scalar(t)) => *t,
            Some(other) => {
                return Err(BridgeError::new(
                    ID_TYPE,
                    format!("Timestamp must be a scalar, got {}.", other.type_name()),
                ))
            }
        };
        if operands.len() > 2 {
            return Err(BridgeError::new(ID_BAD_INPUT, ESTIMATE_USAGE));
        }

        let dims = self.port.dimensions(&self.descriptor)?;
        if observation.len() != dims.nz {
            return Err(BridgeError::new(
                ID_DIM,
                format!(
                    "Observation length ({}) does not match Nz ({}).",
                    observation.len(),
                    dims.nz
                ),
            ));
        }

        let state = self.port.step(&mut self.descriptor, observation, timestamp)?;
        self.last_timestamp = timestamp;
        Ok(BridgeReply::Vector(state.iter().copied().collect()))
    }
}

impl<P: EstimatorPort> Drop for CommandBridge<P> {
    /// A session left open is terminated, so module-owned buffers are released
    /// while the module is still loaded.
    fn drop(&mut self) {
        if self.terminated || self.port.dimensions(&self.descriptor).is_err() {
            return;
        }
        match self.port.terminate(&mut self.descriptor) {
            Ok(()) => debug!(model = self.port.model_name(), "open bridge session terminated"),
            Err(err) => warn!(
                model = self.port.model_name(),
                error = %err,
                "failed to terminate an open bridge session"
            ),
        }
    }
}

fn expect_no_operands(command: &str, operands: &[BridgeArg]) -> Result<(), BridgeError> {
    if operands.is_empty() {
        Ok(())
    } else {
        Err(BridgeError::new(
            ID_BAD_INPUT,
            format!("'{command}' takes no arguments, got {}.", operands.len()),
        ))
    }
}
