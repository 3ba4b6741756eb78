//! Text protocol carried inside CoAP payloads
//!
//! Requests and responses are flat ASCII strings:
//! - Credentials: `username:password`
//! - Privileged calls: `token` or `token:state`
//! - Replies are recognized by their prefix (`SUCCESS`, `TOKEN:`, `STATE:`, `LOGS:`)
//! - The dashboard is a `|`-separated list of `key:value` pairs
//!
//! Malformed sub-fields of the dashboard and log listings are dropped one by
//! one; only a response of the wrong overall shape is an error.

use std::fmt;
use std::time::Duration;

use crate::error::DecodeError;
use crate::session::Credentials;

const SUCCESS_PREFIX: &str = "SUCCESS";
const TOKEN_PREFIX: &str = "TOKEN:";
const STATE_PREFIX: &str = "STATE:";
const LOGS_PREFIX: &str = "LOGS:";

/// Marker the device sends instead of an empty listing
pub const NO_LOGS_MARKER: &str = "No logs available";

/// CoAP request method used by a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// Protocol verbs, used to label requests and errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    Login,
    SetActuator,
    ActuatorState,
    Dashboard,
    Logs,
}

impl Operation {
    pub fn method(self) -> Method {
        match self {
            Operation::Register | Operation::Login => Method::Post,
            Operation::SetActuator => Method::Put,
            Operation::ActuatorState | Operation::Dashboard | Operation::Logs => Method::Get,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Operation::Register => "/register",
            Operation::Login => "/login",
            Operation::SetActuator | Operation::ActuatorState => "/led",
            Operation::Dashboard => "/dashboard",
            Operation::Logs => "/logs",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Register => "register",
            Operation::Login => "login",
            Operation::SetActuator => "set-led",
            Operation::ActuatorState => "get-led",
            Operation::Dashboard => "dashboard",
            Operation::Logs => "logs",
        })
    }
}

/// LED state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActuatorState {
    On,
    Off,
}

impl ActuatorState {
    /// Request-side encoding (`1`/`0`)
    pub fn wire_digit(self) -> char {
        match self {
            ActuatorState::On => '1',
            ActuatorState::Off => '0',
        }
    }

    /// Parse a reported state. The device answers `ON`/`OFF`; the digit form is accepted too.
    pub fn parse(value: &str) -> Result<Self, DecodeError> {
        match value {
            "1" => Ok(ActuatorState::On),
            "0" => Ok(ActuatorState::Off),
            v if v.eq_ignore_ascii_case("on") => Ok(ActuatorState::On),
            v if v.eq_ignore_ascii_case("off") => Ok(ActuatorState::Off),
            other => Err(DecodeError::InvalidState(other.to_string())),
        }
    }
}

impl fmt::Display for ActuatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActuatorState::On => "ON",
            ActuatorState::Off => "OFF",
        })
    }
}

/// Outgoing request, one variant per protocol verb
#[derive(Debug, Clone)]
pub enum Command<'a> {
    Register(&'a Credentials),
    Login(&'a Credentials),
    SetActuator { token: &'a str, state: ActuatorState },
    ActuatorState { token: &'a str },
    Dashboard { token: &'a str },
    Logs { token: &'a str },
}

impl Command<'_> {
    pub fn operation(&self) -> Operation {
        match self {
            Command::Register(_) => Operation::Register,
            Command::Login(_) => Operation::Login,
            Command::SetActuator { .. } => Operation::SetActuator,
            Command::ActuatorState { .. } => Operation::ActuatorState,
            Command::Dashboard { .. } => Operation::Dashboard,
            Command::Logs { .. } => Operation::Logs,
        }
    }

    pub fn method(&self) -> Method {
        self.operation().method()
    }

    pub fn path(&self) -> &'static str {
        self.operation().path()
    }

    /// Payload bytes for this request
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Register(creds) | Command::Login(creds) => {
                format!("{}:{}", creds.username, creds.password).into_bytes()
            }
            Command::SetActuator { token, state } => {
                format!("{}:{}", token, state.wire_digit()).into_bytes()
            }
            Command::ActuatorState { token }
            | Command::Dashboard { token }
            | Command::Logs { token } => token.as_bytes().to_vec(),
        }
    }
}

/// A decoded reply: either the expected value or the device's refusal text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply<T> {
    Accepted(T),
    Rejected(String),
}

impl<T> Reply<T> {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Reply::Accepted(_))
    }
}

/// Ordered key/value telemetry, duplicates kept as received
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSnapshot {
    fields: Vec<(String, String)>,
}

impl DashboardSnapshot {
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// First value recorded under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<Vec<(String, String)>> for DashboardSnapshot {
    fn from(fields: Vec<(String, String)>) -> Self {
        Self { fields }
    }
}

/// One LED state change recorded by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub user: String,
    pub state: String,
    /// Milliseconds since device boot
    pub timestamp_millis: u64,
}

impl LogEntry {
    pub fn timestamp(&self) -> Duration {
        Duration::from_millis(self.timestamp_millis)
    }
}

fn text(payload: &[u8]) -> Result<&str, DecodeError> {
    Ok(std::str::from_utf8(payload)?)
}

/// Register and set-actuator replies: success iff the text starts with `SUCCESS`
pub fn decode_ack(payload: &[u8]) -> Result<Reply<String>, DecodeError> {
    let text = text(payload)?;
    if text.starts_with(SUCCESS_PREFIX) {
        Ok(Reply::Accepted(text.to_string()))
    } else {
        Ok(Reply::Rejected(text.to_string()))
    }
}

/// Login reply: `TOKEN:<token>`. The token is the segment right after the
/// `TOKEN` literal, so it can never contain `:`.
pub fn decode_login(payload: &[u8]) -> Result<Reply<String>, DecodeError> {
    let text = text(payload)?;
    if !text.starts_with(TOKEN_PREFIX) {
        return Ok(Reply::Rejected(text.to_string()));
    }

    match text.split(':').nth(1) {
        Some(token) if !token.is_empty() => Ok(Reply::Accepted(token.to_string())),
        _ => Err(DecodeError::EmptyToken),
    }
}

/// LED state reply: `STATE:<ON|OFF|1|0>`
pub fn decode_state(payload: &[u8]) -> Result<Reply<ActuatorState>, DecodeError> {
    let text = text(payload)?;
    if !text.starts_with(STATE_PREFIX) {
        return Ok(Reply::Rejected(text.to_string()));
    }

    let value = text.split(':').nth(1).unwrap_or_default();
    ActuatorState::parse(value).map(Reply::Accepted)
}

/// Dashboard reply: `k1:v1|k2:v2|...`
///
/// Segments that do not split into exactly two parts on `:` are dropped.
pub fn decode_dashboard(payload: &[u8]) -> Result<DashboardSnapshot, DecodeError> {
    let text = text(payload)?;
    if text.is_empty() {
        return Ok(DashboardSnapshot::default());
    }

    let fields: Vec<(String, String)> = text
        .split('|')
        .filter_map(|segment| {
            let (key, value) = segment.split_once(':')?;
            if value.contains(':') {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect();

    if fields.is_empty() {
        return Err(DecodeError::UnrecognizedShape {
            operation: Operation::Dashboard,
            payload: text.to_string(),
        });
    }

    Ok(fields.into())
}

/// Logs reply: `LOGS:user,state,millis;user,state,millis;...`
///
/// Entries that are not exactly three comma-separated fields, or whose
/// timestamp is not an integer, are dropped. Order is preserved.
pub fn decode_logs(payload: &[u8]) -> Result<Reply<Vec<LogEntry>>, DecodeError> {
    let text = text(payload)?;
    let Some(body) = text.strip_prefix(LOGS_PREFIX) else {
        return Ok(Reply::Rejected(text.to_string()));
    };

    if body.is_empty() || body == NO_LOGS_MARKER {
        return Ok(Reply::Accepted(Vec::new()));
    }

    let entries = body.split(';').filter_map(parse_log_entry).collect();
    Ok(Reply::Accepted(entries))
}

fn parse_log_entry(raw: &str) -> Option<LogEntry> {
    let parts: Vec<&str> = raw.split(',').collect();
    let [user, state, millis] = parts.as_slice() else {
        return None;
    };

    Some(LogEntry {
        user: user.to_string(),
        state: state.to_string(),
        timestamp_millis: millis.parse().ok()?,
    })
}
