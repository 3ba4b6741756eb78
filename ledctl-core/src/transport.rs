//! Transport adapter seam
//!
//! The core only decides method, resource path and payload. Moving the bytes
//! is delegated to a [`Transport`]; [`CoapTransport`] is the UDP/CoAP one.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use coap_lite::{CoapRequest, MessageClass, MessageType, Packet, RequestType};
use rand::Rng;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::codec::Method;
use crate::error::TransportError;

/// Default CoAP port
pub const DEFAULT_COAP_PORT: u16 = 5683;

/// Largest datagram we expect back (RFC 7252 recommended size)
const MAX_DATAGRAM: usize = 1152;

/// One request/response exchange with the device
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(
        &self,
        method: Method,
        path: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}

/// CoAP over UDP. Each exchange uses a fresh socket, a random message id and
/// a random token; no retransmission is attempted.
#[derive(Debug, Clone)]
pub struct CoapTransport {
    server_addr: SocketAddr,
}

impl CoapTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    /// Resolve `host` and use the first address found
    pub async fn resolve(host: &str, port: u16) -> Result<Self, TransportError> {
        let server_addr = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| TransportError::Network(format!("No address for {}", host)))?;
        Ok(Self::new(server_addr))
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    async fn round_trip(&self, method: Method, path: &str, payload: Vec<u8>) -> Result<Vec<u8>, TransportError> {
        let bind_addr = if self.server_addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(self.server_addr).await?;

        let (message_id, token) = {
            let mut rng = rand::thread_rng();
            (rng.r#gen::<u16>(), rng.r#gen::<[u8; 4]>().to_vec())
        };

        let mut request: CoapRequest<SocketAddr> = CoapRequest::new();
        request.set_method(request_type(method));
        request.set_path(path);
        request.message.header.set_type(MessageType::Confirmable);
        request.message.header.message_id = message_id;
        request.message.set_token(token.clone());
        request.message.payload = payload;

        let bytes = request
            .message
            .to_bytes()
            .map_err(|e| TransportError::Network(format!("Failed to encode request: {}", e)))?;
        socket.send(&bytes).await?;

        debug!(
            method = %method,
            path = %path,
            message_id,
            server = %self.server_addr,
            "Sent CoAP request"
        );

        let mut buf = vec![0u8; MAX_DATAGRAM];
        loop {
            let size = socket.recv(&mut buf).await?;
            let packet = match Packet::from_bytes(&buf[..size]) {
                Ok(packet) => packet,
                Err(e) => {
                    debug!(error = %e, "Ignoring undecodable datagram");
                    continue;
                }
            };

            if packet.header.get_type() == MessageType::Reset {
                return Err(TransportError::Network("Request reset by device".to_string()));
            }

            // Empty ACK: the device will send the real response separately
            if packet.header.code == MessageClass::Empty {
                continue;
            }

            // Piggybacked ACKs are matched on message id; some servers echo no token
            let token_matches = packet.get_token()[..] == token[..];
            let piggybacked = packet.header.get_type() == MessageType::Acknowledgement
                && packet.header.message_id == message_id
                && (token_matches || packet.get_token().is_empty());
            if !piggybacked && !token_matches {
                debug!(message_id = packet.header.message_id, "Ignoring response for another request");
                continue;
            }

            if packet.header.get_type() == MessageType::Confirmable {
                let mut ack = Packet::new();
                ack.header.set_type(MessageType::Acknowledgement);
                ack.header.code = MessageClass::Empty;
                ack.header.message_id = packet.header.message_id;
                if let Ok(ack_bytes) = ack.to_bytes() {
                    socket.send(&ack_bytes).await?;
                }
            }

            debug!(
                code = %packet.header.code,
                len = packet.payload.len(),
                "Received CoAP response"
            );
            return Ok(packet.payload);
        }
    }
}

#[async_trait]
impl Transport for CoapTransport {
    async fn exchange(
        &self,
        method: Method,
        path: &str,
        payload: Vec<u8>,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        tokio::time::timeout(timeout, self.round_trip(method, path, payload))
            .await
            .map_err(|_| TransportError::Timeout)?
    }
}

fn request_type(method: Method) -> RequestType {
    match method {
        Method::Get => RequestType::Get,
        Method::Post => RequestType::Post,
        Method::Put => RequestType::Put,
    }
}
