//! ledctl-core: client side of the CoAP LED control protocol
//!
//! This crate provides:
//! - Codec for the text payloads carried in CoAP requests and responses
//! - Session holding the bearer token of the logged-in user
//! - Client facade with one call per protocol verb
//! - CoAP/UDP transport adapter
//! - Configuration of known devices

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use client::Client;
pub use codec::{ActuatorState, DashboardSnapshot, LogEntry, Method, Operation};
pub use config::{Config, DeviceConfig};
pub use error::{ClientError, ClientResult, DecodeError, TransportError};
pub use session::{Credentials, Session, SessionState};
pub use transport::{CoapTransport, Transport, DEFAULT_COAP_PORT};
