//! Client-side authentication state
//!
//! The device hands out an opaque bearer token at login. The client keeps
//! that token together with the username it was issued to; both live only in
//! process memory. There is no expiry or refresh on the client side and no
//! server-side logout.

use std::fmt;

/// Username/password pair sent to `/register` and `/login`
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// Coarse session state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated,
}

#[derive(Clone, PartialEq, Eq)]
struct Identity {
    token: String,
    username: String,
}

/// Token and username of the logged-in user.
///
/// Both are stored as one optional value so one can never be set without
/// the other.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// Replace any previous identity with this one
    pub fn authenticate(&mut self, token: impl Into<String>, username: impl Into<String>) {
        self.identity = Some(Identity {
            token: token.into(),
            username: username.into(),
        });
    }

    /// Forget the token and username. Safe to call when already anonymous.
    pub fn clear(&mut self) {
        self.identity = None;
    }

    pub fn token(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.token.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.username.as_str())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username())
            .field("token", &self.token().map(|_| "[redacted]"))
            .finish()
    }
}
