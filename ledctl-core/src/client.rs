//! Client facade: one async call per protocol verb
//!
//! Each call checks local preconditions, encodes the request, performs exactly
//! one transport exchange, decodes the reply and updates the session when the
//! verb calls for it. Nothing is retried here.

use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::codec::{
    self, ActuatorState, Command, DashboardSnapshot, LogEntry, Operation, Reply,
};
use crate::error::{ClientError, ClientResult, TransportError};
use crate::session::{Credentials, Session};
use crate::transport::Transport;

/// Default time allowed for one exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(3000);

/// LED controller client
pub struct Client<T> {
    transport: T,
    session: RwLock<Session>,
    timeout: Duration,
    parent_cancel: Option<CancellationToken>,
    cancel: Mutex<CancellationToken>,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            session: RwLock::new(Session::new()),
            timeout: DEFAULT_TIMEOUT,
            parent_cancel: None,
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Time allowed for each exchange
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Tie every exchange to an external token; cancelling it fails in-flight
    /// and future calls with `Cancelled`
    pub fn with_cancellation(mut self, parent: CancellationToken) -> Self {
        self.cancel = Mutex::new(parent.child_token());
        self.parent_cancel = Some(parent);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Abort every exchange currently in flight. Later calls run normally.
    pub async fn cancel_pending(&self) {
        let mut cancel = self.cancel.lock().await;
        cancel.cancel();
        *cancel = match &self.parent_cancel {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    pub async fn username(&self) -> Option<String> {
        self.session.read().await.username().map(str::to_owned)
    }

    /// Copy of the current session
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Create an account. `Ok(false)` when the device refuses.
    pub async fn register(&self, username: &str, password: &str) -> ClientResult<bool> {
        let credentials = Credentials::new(username, password);
        let reply = self.exchange(&Command::Register(&credentials)).await?;
        Ok(codec::decode_ack(&reply)?.is_accepted())
    }

    /// Log in and, on success, replace the current session.
    ///
    /// A refused or failed attempt leaves any existing session untouched.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<bool> {
        let credentials = Credentials::new(username, password);
        let reply = self.exchange(&Command::Login(&credentials)).await?;

        match codec::decode_login(&reply)? {
            Reply::Accepted(token) => {
                self.session.write().await.authenticate(token, credentials.username);
                Ok(true)
            }
            Reply::Rejected(_) => Ok(false),
        }
    }

    /// Drop the local session. There is no server-side logout.
    pub async fn logout(&self) {
        self.session.write().await.clear();
    }

    /// Switch the LED. `Ok(false)` when the device refuses.
    pub async fn set_actuator(&self, state: ActuatorState) -> ClientResult<bool> {
        let token = self.token().await?;
        let reply = self.exchange(&Command::SetActuator { token: &token, state }).await?;
        Ok(codec::decode_ack(&reply)?.is_accepted())
    }

    pub async fn actuator_state(&self) -> ClientResult<ActuatorState> {
        let token = self.token().await?;
        let reply = self.exchange(&Command::ActuatorState { token: &token }).await?;
        accepted(Operation::ActuatorState, codec::decode_state(&reply)?)
    }

    pub async fn dashboard(&self) -> ClientResult<DashboardSnapshot> {
        let token = self.token().await?;
        let reply = self.exchange(&Command::Dashboard { token: &token }).await?;
        Ok(codec::decode_dashboard(&reply)?)
    }

    /// Activity log in the order the device reported it
    pub async fn logs(&self) -> ClientResult<Vec<LogEntry>> {
        let token = self.token().await?;
        let reply = self.exchange(&Command::Logs { token: &token }).await?;
        accepted(Operation::Logs, codec::decode_logs(&reply)?)
    }

    // Private helpers

    async fn token(&self) -> ClientResult<String> {
        self.session
            .read()
            .await
            .token()
            .map(str::to_owned)
            .ok_or(ClientError::Unauthenticated)
    }

    async fn exchange(&self, command: &Command<'_>) -> ClientResult<Vec<u8>> {
        let cancel = self.cancel.lock().await.clone();
        let request = self.transport.exchange(
            command.method(),
            command.path(),
            command.encode(),
            self.timeout,
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Transport(TransportError::Cancelled)),
            result = tokio::time::timeout(self.timeout, request) => match result {
                Ok(payload) => payload.map_err(ClientError::Transport),
                Err(_) => Err(ClientError::Transport(TransportError::Timeout)),
            },
        }
    }
}

fn accepted<V>(operation: Operation, reply: Reply<V>) -> ClientResult<V> {
    match reply {
        Reply::Accepted(value) => Ok(value),
        Reply::Rejected(message) => Err(ClientError::Rejected { operation, message }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Method;
    use crate::error::DecodeError;
    use crate::session::SessionState;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Debug, Clone, PartialEq)]
    struct Call {
        method: Method,
        path: String,
        payload: Vec<u8>,
    }

    /// Replays canned replies in order and records every request
    #[derive(Default)]
    struct ScriptedTransport {
        replies: std::sync::Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
        calls: std::sync::Mutex<Vec<Call>>,
        delay: Option<Duration>,
        /// Calls answered without `delay`
        prompt_calls: usize,
    }

    impl ScriptedTransport {
        fn replying(replies: &[&str]) -> Self {
            Self {
                replies: std::sync::Mutex::new(
                    replies.iter().map(|r| Ok(r.as_bytes().to_vec())).collect(),
                ),
                ..Default::default()
            }
        }

        fn failing(error: TransportError) -> Self {
            Self {
                replies: std::sync::Mutex::new(VecDeque::from([Err(error)])),
                ..Default::default()
            }
        }

        fn slow(reply: &str, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::replying(&[reply])
            }
        }

        /// Answers `prompt` right away, then stalls on `reply`
        fn slow_after(prompt: &[&str], reply: &str, delay: Duration) -> Self {
            let mut all = prompt.to_vec();
            all.push(reply);
            Self {
                delay: Some(delay),
                prompt_calls: prompt.len(),
                ..Self::replying(&all)
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn exchange(
            &self,
            method: Method,
            path: &str,
            payload: Vec<u8>,
            _timeout: Duration,
        ) -> Result<Vec<u8>, TransportError> {
            let seen = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(Call {
                    method,
                    path: path.to_string(),
                    payload,
                });
                calls.len()
            };
            if let Some(delay) = self.delay {
                if seen > self.prompt_calls {
                    tokio::time::sleep(delay).await;
                }
            }
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".into())))
        }
    }

    async fn logged_in(replies: &[&str]) -> Client<ScriptedTransport> {
        let mut all = vec!["TOKEN:tok"];
        all.extend_from_slice(replies);
        let client = Client::new(ScriptedTransport::replying(&all));
        assert!(client.login("alice", "pw").await.unwrap());
        client
    }

    #[tokio::test]
    async fn test_register_success_iff_success_prefix() {
        let client = Client::new(ScriptedTransport::replying(&[
            "SUCCESS:Registered",
            "ERROR:User exists",
            "ERROR:Min 3 chars",
        ]));

        assert!(assert_ok!(client.register("alice", "secret").await));
        assert!(!assert_ok!(client.register("alice", "secret").await));
        assert!(!assert_ok!(client.register("al", "x").await));

        let calls = client.transport().calls();
        assert_eq!(
            calls[0],
            Call {
                method: Method::Post,
                path: "/register".to_string(),
                payload: b"alice:secret".to_vec(),
            }
        );
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let client = Client::new(ScriptedTransport::replying(&["TOKEN:abc123"]));
        assert!(client.login("u", "p").await.unwrap());

        let session = client.session().await;
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.token(), Some("abc123"));
        assert_eq!(session.username(), Some("u"));

        let calls = client.transport().calls();
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].path, "/login");
        assert_eq!(calls[0].payload, b"u:p");
    }

    #[tokio::test]
    async fn test_failed_login_keeps_existing_session() {
        let client = Client::new(ScriptedTransport::replying(&[
            "TOKEN:first",
            "ERROR:Wrong password",
        ]));
        assert!(client.login("alice", "pw").await.unwrap());
        assert!(!client.login("bob", "nope").await.unwrap());

        let session = client.session().await;
        assert_eq!(session.token(), Some("first"));
        assert_eq!(session.username(), Some("alice"));
    }

    #[tokio::test]
    async fn test_undecodable_login_keeps_existing_session() {
        let client = Client::new(ScriptedTransport::replying(&["TOKEN:first", "TOKEN:"]));
        assert!(client.login("alice", "pw").await.unwrap());

        let err = client.login("bob", "pw").await.unwrap_err();
        assert_eq!(err, ClientError::Decode(DecodeError::EmptyToken));
        assert_eq!(client.username().await.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_relogin_overwrites_session() {
        let client = Client::new(ScriptedTransport::replying(&["TOKEN:first", "TOKEN:second"]));
        assert!(client.login("alice", "pw").await.unwrap());
        assert!(client.login("bob", "pw").await.unwrap());

        let session = client.session().await;
        assert_eq!(session.token(), Some("second"));
        assert_eq!(session.username(), Some("bob"));
    }

    #[tokio::test]
    async fn test_privileged_calls_require_login() {
        let client = Client::new(ScriptedTransport::default());

        assert_eq!(
            client.set_actuator(ActuatorState::On).await,
            Err(ClientError::Unauthenticated)
        );
        assert_eq!(client.actuator_state().await, Err(ClientError::Unauthenticated));
        assert_eq!(client.dashboard().await, Err(ClientError::Unauthenticated));
        assert_eq!(client.logs().await, Err(ClientError::Unauthenticated));

        assert!(client.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn test_set_actuator() {
        let client = logged_in(&["SUCCESS:LED ON", "ERROR:Invalid token"]).await;

        assert!(client.set_actuator(ActuatorState::On).await.unwrap());
        assert!(!client.set_actuator(ActuatorState::Off).await.unwrap());

        let calls = client.transport().calls();
        assert_eq!(calls[1].method, Method::Put);
        assert_eq!(calls[1].path, "/led");
        assert_eq!(calls[1].payload, b"tok:1");
        assert_eq!(calls[2].payload, b"tok:0");

        // A refused switch does not log the user out
        assert!(client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_actuator_state() {
        let client = logged_in(&["STATE:ON", "ERROR:Invalid token"]).await;

        assert_eq!(client.actuator_state().await, Ok(ActuatorState::On));
        assert_eq!(
            client.actuator_state().await,
            Err(ClientError::Rejected {
                operation: Operation::ActuatorState,
                message: "ERROR:Invalid token".to_string(),
            })
        );

        let calls = client.transport().calls();
        assert_eq!(calls[1].method, Method::Get);
        assert_eq!(calls[1].path, "/led");
        assert_eq!(calls[1].payload, b"tok");
    }

    #[tokio::test]
    async fn test_dashboard() {
        let client = logged_in(&["USER:alice|LED:OFF|USERS:2|LOGS:5"]).await;

        let snapshot = client.dashboard().await.unwrap();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot.get("USER"), Some("alice"));
        assert_eq!(snapshot.get("LOGS"), Some("5"));

        assert_eq!(client.transport().calls()[1].path, "/dashboard");
    }

    #[tokio::test]
    async fn test_logs() {
        let client = logged_in(&[
            "LOGS:alice,ON,1500;bob,OFF,3200",
            "LOGS:No logs available",
            "ERROR:Invalid token",
        ])
        .await;

        let entries = client.logs().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].user, "alice");
        assert_eq!(entries[1].timestamp_millis, 3200);

        assert!(client.logs().await.unwrap().is_empty());

        let err = assert_err!(client.logs().await);
        assert!(matches!(err, ClientError::Rejected { operation: Operation::Logs, .. }));
        assert_eq!(client.transport().calls()[1].path, "/logs");
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let client = logged_in(&[]).await;

        client.logout().await;
        let first = client.session().await;
        client.logout().await;
        let second = client.session().await;

        assert_eq!(first, second);
        assert_eq!(second.state(), SessionState::Anonymous);
        // Logout never touches the transport
        assert_eq!(client.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_surfaced() {
        let client = Client::new(ScriptedTransport::failing(TransportError::Network(
            "unreachable".into(),
        )));

        let err = client.register("alice", "pw").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Transport(TransportError::Network("unreachable".into()))
        );
    }

    #[tokio::test]
    async fn test_invalid_utf8_reply() {
        let client = Client::new(ScriptedTransport::default());
        client
            .transport()
            .replies
            .lock()
            .unwrap()
            .push_back(Ok(vec![0xff, 0xfe]));

        let err = client.register("alice", "pw").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(DecodeError::InvalidUtf8(_))));
    }

    #[tokio::test]
    async fn test_timeout_leaves_session_unchanged() {
        let client = Client::new(ScriptedTransport::slow("TOKEN:late", Duration::from_secs(5)))
            .with_timeout(Duration::from_millis(20));

        let err = client.login("alice", "pw").await.unwrap_err();
        assert_eq!(err, ClientError::Transport(TransportError::Timeout));
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_cancel_pending() {
        let client = Arc::new(Client::new(ScriptedTransport::slow(
            "TOKEN:late",
            Duration::from_secs(5),
        )));

        let pending = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.login("alice", "pw").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.cancel_pending().await;

        let result = pending.await.unwrap();
        assert_eq!(result, Err(ClientError::Transport(TransportError::Cancelled)));
        assert!(!client.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_timeout_keeps_existing_session() {
        let client = Client::new(ScriptedTransport::slow_after(
            &["TOKEN:first"],
            "TOKEN:late",
            Duration::from_secs(5),
        ))
        .with_timeout(Duration::from_millis(50));
        assert!(client.login("alice", "pw").await.unwrap());
        let before = client.session().await;

        let err = client.login("bob", "pw").await.unwrap_err();
        assert_eq!(err, ClientError::Transport(TransportError::Timeout));
        let err = client.set_actuator(ActuatorState::On).await.unwrap_err();
        assert_eq!(err, ClientError::Transport(TransportError::Timeout));

        let after = client.session().await;
        assert_eq!(after, before);
        assert_eq!(after.token(), Some("first"));
        assert_eq!(after.username(), Some("alice"));
    }

    #[tokio::test]
    async fn test_cancel_keeps_existing_session() {
        let client = Arc::new(Client::new(ScriptedTransport::slow_after(
            &["TOKEN:first"],
            "TOKEN:late",
            Duration::from_secs(5),
        )));
        assert!(client.login("alice", "pw").await.unwrap());

        let pending = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.login("bob", "pw").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        client.cancel_pending().await;

        let result = pending.await.unwrap();
        assert_eq!(result, Err(ClientError::Transport(TransportError::Cancelled)));

        let session = client.session().await;
        assert_eq!(session.token(), Some("first"));
        assert_eq!(session.username(), Some("alice"));
    }

    #[tokio::test]
    async fn test_external_cancellation() {
        let shutdown = CancellationToken::new();
        let client = Client::new(ScriptedTransport::replying(&["SUCCESS:Registered"]))
            .with_cancellation(shutdown.clone());

        shutdown.cancel();
        assert_eq!(
            client.register("alice", "pw").await,
            Err(ClientError::Transport(TransportError::Cancelled))
        );
    }
}
