// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-sample session lifecycle.
//!
//! Every sample gets a fresh session from [`SessionManager::connect`] and
//! hands it back to [`SessionManager::disconnect`] once its single
//! operation is over, whatever the outcome. Sessions are never pooled.

use std::sync::Arc;
use thiserror::Error;
use tokio::time::timeout;

use super::auth::CredentialResponder;
use super::error::Error;
use super::params::ConnectionParams;
use super::tokio_client::RusshTransport;
use super::transport::{SshSession, SshTransport};

/// Reason used when the transport fails without saying why.
pub const UNKNOWN_FAILURE_REASON: &str = "Unknown";

/// A connection attempt that did not produce a usable session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ConnectFailure {
    pub reason: String,
}

impl ConnectFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason.is_empty() {
            Self {
                reason: UNKNOWN_FAILURE_REASON.to_string(),
            }
        } else {
            Self { reason }
        }
    }
}

impl From<Error> for ConnectFailure {
    fn from(e: Error) -> Self {
        Self::new(e.to_string())
    }
}

/// Opens and closes sessions on an injected transport.
#[derive(Clone)]
pub struct SessionManager {
    transport: Arc<dyn SshTransport>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn SshTransport>) -> Self {
        Self { transport }
    }

    /// A manager backed by a fresh russh client context.
    pub fn with_russh() -> Self {
        Self::new(Arc::new(RusshTransport::new()))
    }

    pub fn transport(&self) -> &Arc<dyn SshTransport> {
        &self.transport
    }

    /// Open an authenticated session.
    ///
    /// Every failure, including a handshake that makes no progress within
    /// `connect_timeout_ms`, comes back as a [`ConnectFailure`] carrying the
    /// underlying message. No partially open session outlives this call.
    pub async fn connect(
        &self,
        params: &ConnectionParams,
        credentials: &CredentialResponder,
    ) -> Result<Box<dyn SshSession>, ConnectFailure> {
        let connect_timeout = params.connect_timeout();
        tracing::debug!(
            "Connecting to {} (timeout {} ms)",
            params.destination(),
            params.connect_timeout_ms
        );

        let result = if connect_timeout.is_zero() {
            self.transport.connect(params, credentials).await
        } else {
            match timeout(connect_timeout, self.transport.connect(params, credentials)).await {
                Ok(result) => result,
                Err(_) => Err(Error::ConnectTimeout(connect_timeout)),
            }
        };

        match result {
            Ok(session) => {
                tracing::debug!("Session established to {}", params.destination());
                Ok(session)
            }
            Err(e) => {
                tracing::error!("SSH connection error to {}: {}", params.destination(), e);
                Err(ConnectFailure::from(e))
            }
        }
    }

    /// Close and drop the session, if there is one.
    ///
    /// Safe to call any number of times: the slot is emptied on the first
    /// call. A failing disconnect is logged and not retried.
    pub async fn disconnect(&self, session: &mut Option<Box<dyn SshSession>>) {
        let Some(mut session) = session.take() else {
            return;
        };
        if session.is_closed() {
            return;
        }
        if let Err(e) = session.disconnect().await {
            tracing::warn!("Failed to disconnect SSH session: {}", e);
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::with_russh()
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}
