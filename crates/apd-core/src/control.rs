//! Control surface.
//!
//! Requests arrive as [`ControlRequest`] values and are answered with a
//! [`ControlResponse`]. [`ApService`] does the dispatch; [`ControlServer`]
//! runs it on one task so requests are served strictly one at a time, and
//! [`ControlClient`] is the cloneable sending side.
//!
//! Sessions are addressed by [`SessionId`]. A handle that does not name a
//! live session gets [`ControlResponse::Error`]; nothing a client sends can
//! take the daemon down.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use crate::config::ApdConfig;
use crate::error::{ApError, Result};
use crate::interface::InterfaceControl;
use crate::registry::InterfaceRegistry;
use crate::session::ApInterface;
use crate::types::{AuthenticatorState, EncryptionType, SessionId};
use crate::wait::PollConfig;

/// A control request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Claim a free AP interface.
    CreateApInterface,
    /// Get the interface name behind a handle.
    GetInterfaceName {
        /// Session handle.
        handle: SessionId,
    },
    /// Validate and write a hostapd config.
    WriteHostapdConfig {
        /// Session handle.
        handle: SessionId,
        /// SSID bytes.
        #[serde(with = "bytes_or_string")]
        ssid: Vec<u8>,
        /// Hide the SSID from beacons.
        #[serde(default)]
        hidden: bool,
        /// Channel number.
        channel: u32,
        /// Encryption type.
        encryption: EncryptionType,
        /// Passphrase bytes; ignored for open networks.
        #[serde(default, with = "bytes_or_string")]
        passphrase: Vec<u8>,
    },
    /// Start the authenticator.
    StartHostapd {
        /// Session handle.
        handle: SessionId,
    },
    /// Stop the authenticator.
    StopHostapd {
        /// Session handle.
        handle: SessionId,
    },
    /// Poll the authenticator state.
    GetAuthenticatorState {
        /// Session handle.
        handle: SessionId,
    },
    /// Wait for the authenticator to be confirmed running.
    WaitUntilRunning {
        /// Session handle.
        handle: SessionId,
    },
    /// Release every claimed interface.
    TearDownInterfaces,
}

/// A control response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ControlResponse {
    /// Outcome of `CreateApInterface`; `None` when nothing is available.
    ApInterface {
        /// Handle of the new session.
        handle: Option<SessionId>,
    },
    /// Outcome of `GetInterfaceName`.
    InterfaceName {
        /// Interface name.
        name: String,
    },
    /// Outcome of a boolean operation.
    Success {
        /// Whether the operation succeeded.
        success: bool,
    },
    /// Outcome of `GetAuthenticatorState`.
    AuthenticatorState {
        /// Current state.
        state: AuthenticatorState,
        /// Liveness predicate.
        running: bool,
    },
    /// The request could not be served.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl ControlResponse {
    fn success(success: bool) -> Self {
        Self::Success { success }
    }

    fn error(err: &ApError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}

// =============================================================================
// ApService
// =============================================================================

/// Access point service: the registry plus request dispatch.
pub struct ApService {
    registry: InterfaceRegistry,
    readiness: PollConfig,
}

impl ApService {
    /// Creates a service after validating the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: &ApdConfig, control: Arc<dyn InterfaceControl>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: InterfaceRegistry::new(config, control),
            readiness: config.readiness.poll(),
        })
    }

    /// Returns the interface registry.
    #[must_use]
    pub const fn registry(&self) -> &InterfaceRegistry {
        &self.registry
    }

    /// Returns the readiness polling window.
    #[must_use]
    pub const fn readiness(&self) -> PollConfig {
        self.readiness
    }

    /// Claims a free AP interface.
    pub async fn create_ap_interface(&self) -> Option<Arc<ApInterface>> {
        self.registry.create_ap_interface().await
    }

    /// Releases every claimed interface.
    pub async fn tear_down_interfaces(&self) -> bool {
        self.registry.tear_down_interfaces().await
    }

    /// Serves one request.
    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        tracing::debug!(request = ?RequestName(&request), "control request");

        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "control request failed");
                ControlResponse::error(&e)
            }
        }
    }

    async fn dispatch(&self, request: ControlRequest) -> Result<ControlResponse> {
        let response = match request {
            ControlRequest::CreateApInterface => ControlResponse::ApInterface {
                handle: self.create_ap_interface().await.map(|s| s.id()),
            },
            ControlRequest::GetInterfaceName { handle } => ControlResponse::InterfaceName {
                name: self.registry.session(handle).await?.interface_name().to_string(),
            },
            ControlRequest::WriteHostapdConfig {
                handle,
                ssid,
                hidden,
                channel,
                encryption,
                passphrase,
            } => {
                let session = self.registry.session(handle).await?;
                ControlResponse::success(
                    session
                        .write_hostapd_config(ssid, hidden, channel, encryption, passphrase)
                        .await,
                )
            }
            ControlRequest::StartHostapd { handle } => {
                let session = self.registry.session(handle).await?;
                ControlResponse::success(session.start_hostapd().await)
            }
            ControlRequest::StopHostapd { handle } => {
                let session = self.registry.session(handle).await?;
                ControlResponse::success(session.stop_hostapd().await)
            }
            ControlRequest::GetAuthenticatorState { handle } => {
                let session = self.registry.session(handle).await?;
                let state = session.authenticator_state().await;
                ControlResponse::AuthenticatorState {
                    state,
                    running: state.is_alive(),
                }
            }
            ControlRequest::WaitUntilRunning { handle } => {
                let session = self.registry.session(handle).await?;
                ControlResponse::success(session.wait_until_running(self.readiness).await)
            }
            ControlRequest::TearDownInterfaces => {
                ControlResponse::success(self.tear_down_interfaces().await)
            }
        };
        Ok(response)
    }
}

impl std::fmt::Debug for ApService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApService")
            .field("registry", &self.registry)
            .field("readiness", &self.readiness)
            .finish()
    }
}

/// Logs a request by name only; passphrases stay out of the log.
struct RequestName<'a>(&'a ControlRequest);

impl std::fmt::Debug for RequestName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 {
            ControlRequest::CreateApInterface => "create_ap_interface",
            ControlRequest::GetInterfaceName { .. } => "get_interface_name",
            ControlRequest::WriteHostapdConfig { .. } => "write_hostapd_config",
            ControlRequest::StartHostapd { .. } => "start_hostapd",
            ControlRequest::StopHostapd { .. } => "stop_hostapd",
            ControlRequest::GetAuthenticatorState { .. } => "get_authenticator_state",
            ControlRequest::WaitUntilRunning { .. } => "wait_until_running",
            ControlRequest::TearDownInterfaces => "tear_down_interfaces",
        };
        f.write_str(name)
    }
}

// =============================================================================
// ControlServer / ControlClient
// =============================================================================

struct Envelope {
    request: ControlRequest,
    reply: oneshot::Sender<ControlResponse>,
}

/// Serves control requests sequentially.
pub struct ControlServer {
    service: Arc<ApService>,
    request_rx: mpsc::Receiver<Envelope>,
}

impl ControlServer {
    /// Creates a server and the client that feeds it.
    #[must_use]
    pub fn new(service: Arc<ApService>) -> (Self, ControlClient) {
        let (request_tx, request_rx) = mpsc::channel(16);
        let server = Self {
            service,
            request_rx,
        };
        (server, ControlClient { request_tx })
    }

    /// Returns the service behind this server.
    #[must_use]
    pub fn service(&self) -> &Arc<ApService> {
        &self.service
    }

    /// Serves requests until every client has been dropped.
    pub async fn run(mut self) {
        while let Some(envelope) = self.request_rx.recv().await {
            let response = self.service.handle(envelope.request).await;
            // Client gave up waiting; nothing to deliver.
            let _ = envelope.reply.send(response);
        }
        tracing::debug!("control server stopped, all clients dropped");
    }
}

/// Cloneable client for a [`ControlServer`].
#[derive(Clone, Debug)]
pub struct ControlClient {
    request_tx: mpsc::Sender<Envelope>,
}

impl ControlClient {
    /// Sends a request and waits for its response.
    ///
    /// # Errors
    /// Returns `ApError::Control` if the server has stopped.
    pub async fn call(&self, request: ControlRequest) -> Result<ControlResponse> {
        let (reply, response) = oneshot::channel();
        self.request_tx
            .send(Envelope { request, reply })
            .await
            .map_err(|_| ApError::control("control server closed"))?;
        response
            .await
            .map_err(|_| ApError::control("control server dropped the request"))
    }

    /// Claims a free AP interface; `None` if none is available.
    ///
    /// # Errors
    /// Returns an error if the server has stopped.
    pub async fn create_ap_interface(&self) -> Result<Option<SessionId>> {
        match self.call(ControlRequest::CreateApInterface).await? {
            ControlResponse::ApInterface { handle } => Ok(handle),
            other => Err(unexpected(&other)),
        }
    }

    /// Returns the interface name behind `handle`.
    ///
    /// # Errors
    /// Returns an error if the handle is unknown or the server has stopped.
    pub async fn get_interface_name(&self, handle: SessionId) -> Result<String> {
        match self.call(ControlRequest::GetInterfaceName { handle }).await? {
            ControlResponse::InterfaceName { name } => Ok(name),
            other => Err(unexpected(&other)),
        }
    }

    /// Validates and writes a hostapd config.
    ///
    /// # Errors
    /// Returns an error if the handle is unknown or the server has stopped.
    pub async fn write_hostapd_config(
        &self,
        handle: SessionId,
        ssid: impl Into<Vec<u8>>,
        hidden: bool,
        channel: u32,
        encryption: EncryptionType,
        passphrase: impl Into<Vec<u8>>,
    ) -> Result<bool> {
        self.call_bool(ControlRequest::WriteHostapdConfig {
            handle,
            ssid: ssid.into(),
            hidden,
            channel,
            encryption,
            passphrase: passphrase.into(),
        })
        .await
    }

    /// Starts the authenticator.
    ///
    /// # Errors
    /// Returns an error if the handle is unknown or the server has stopped.
    pub async fn start_hostapd(&self, handle: SessionId) -> Result<bool> {
        self.call_bool(ControlRequest::StartHostapd { handle }).await
    }

    /// Stops the authenticator.
    ///
    /// # Errors
    /// Returns an error if the handle is unknown or the server has stopped.
    pub async fn stop_hostapd(&self, handle: SessionId) -> Result<bool> {
        self.call_bool(ControlRequest::StopHostapd { handle }).await
    }

    /// Polls the authenticator state.
    ///
    /// # Errors
    /// Returns an error if the handle is unknown or the server has stopped.
    pub async fn authenticator_state(&self, handle: SessionId) -> Result<AuthenticatorState> {
        match self
            .call(ControlRequest::GetAuthenticatorState { handle })
            .await?
        {
            ControlResponse::AuthenticatorState { state, .. } => Ok(state),
            other => Err(unexpected(&other)),
        }
    }

    /// Waits for the authenticator to be confirmed running.
    ///
    /// # Errors
    /// Returns an error if the handle is unknown or the server has stopped.
    pub async fn wait_until_running(&self, handle: SessionId) -> Result<bool> {
        self.call_bool(ControlRequest::WaitUntilRunning { handle })
            .await
    }

    /// Releases every claimed interface.
    ///
    /// # Errors
    /// Returns an error if the server has stopped.
    pub async fn tear_down_interfaces(&self) -> Result<bool> {
        self.call_bool(ControlRequest::TearDownInterfaces).await
    }

    async fn call_bool(&self, request: ControlRequest) -> Result<bool> {
        match self.call(request).await? {
            ControlResponse::Success { success } => Ok(success),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &ControlResponse) -> ApError {
    match response {
        ControlResponse::Error { message } => ApError::control(message.clone()),
        other => ApError::control(format!("unexpected response {other:?}")),
    }
}

/// Serde helper: bytes as a UTF-8 string when possible, else an array.
mod bytes_or_string {
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match std::str::from_utf8(bytes) {
            Ok(s) => serializer.serialize_str(s),
            Err(_) => serializer.collect_seq(bytes),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = Vec<u8>;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a string or an array of bytes")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(v.as_bytes().to_vec())
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(v.to_vec())
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(b) = seq.next_element::<u8>()? {
                    out.push(b);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_any(BytesVisitor)
    }
}
