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

//! SSH connection establishment and the session handle.

use async_trait::async_trait;
use russh::client::{Config, Handle, Handler};
use std::fmt::Debug;
use std::sync::Arc;

use super::authentication::authenticate;
use super::channel_manager::RusshExecChannel;
use super::file_transfer::RusshSftpChannel;
use crate::ssh::auth::CredentialResponder;
use crate::ssh::error::Error;
use crate::ssh::params::ConnectionParams;
use crate::ssh::transport::{ExecChannel, SftpChannel, SshSession, SshTransport};

/// Client context shared by all samplers of a process.
///
/// Only holds the russh client configuration; every call to
/// [`SshTransport::connect`] builds an independent connection.
#[derive(Clone)]
pub struct RusshTransport {
    config: Arc<Config>,
}

impl RusshTransport {
    pub fn new() -> Self {
        Self {
            config: Arc::new(Config::default()),
        }
    }
}

impl Default for RusshTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for RusshTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl SshTransport for RusshTransport {
    async fn connect(
        &self,
        params: &ConnectionParams,
        credentials: &CredentialResponder,
    ) -> Result<Box<dyn SshSession>, Error> {
        let handler = ClientHandler::new(params.host.clone(), credentials.clone());
        let handshake = russh::client::connect(
            self.config.clone(),
            (params.host.as_str(), params.port),
            handler,
        );

        let connect_timeout = params.connect_timeout();
        let mut handle = if connect_timeout.is_zero() {
            handshake.await?
        } else {
            tokio::time::timeout(connect_timeout, handshake)
                .await
                .map_err(|_| Error::ConnectTimeout(connect_timeout))??
        };

        let key_path = params.expanded_private_key();
        if let Err(e) = authenticate(
            &mut handle,
            &params.username,
            key_path.as_deref(),
            credentials,
        )
        .await
        {
            // Don't leave a half-open transport behind
            if let Err(close_err) = handle
                .disconnect(russh::Disconnect::ByApplication, "", "")
                .await
            {
                tracing::debug!(
                    "Failed to disconnect after authentication failure: {}",
                    close_err
                );
            }
            return Err(e);
        }

        Ok(Box::new(RusshSession::new(handle, params.destination())))
    }
}

/// An authenticated russh connection.
pub struct RusshSession {
    handle: Handle<ClientHandler>,
    destination: String,
    disconnected: bool,
}

impl RusshSession {
    pub fn new(handle: Handle<ClientHandler>, destination: String) -> Self {
        Self {
            handle,
            destination,
            disconnected: false,
        }
    }

    async fn open_session_channel(&self) -> Result<russh::Channel<russh::client::Msg>, Error> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }
        self.handle
            .channel_open_session()
            .await
            .map_err(Error::Ssh)
    }
}

#[async_trait]
impl SshSession for RusshSession {
    async fn open_exec(&mut self) -> Result<Box<dyn ExecChannel>, Error> {
        let channel = self.open_session_channel().await?;
        tracing::trace!("Opened exec channel on {}", self.destination);
        Ok(Box::new(RusshExecChannel::new(channel)))
    }

    async fn open_sftp(&mut self) -> Result<Box<dyn SftpChannel>, Error> {
        let channel = self.open_session_channel().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = RusshSftpChannel::open(channel.into_stream()).await?;
        tracing::trace!("Opened sftp channel on {}", self.destination);
        Ok(Box::new(sftp))
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        if self.disconnected {
            return Ok(());
        }
        self.disconnected = true;
        if self.handle.is_closed() {
            return Ok(());
        }
        tracing::debug!("Disconnecting from {}", self.destination);
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "")
            .await
            .map_err(Error::Ssh)
    }

    fn is_closed(&self) -> bool {
        self.disconnected || self.handle.is_closed()
    }
}

impl Debug for RusshSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusshSession")
            .field("destination", &self.destination)
            .field("disconnected", &self.disconnected)
            .field("handle", &"Handle<ClientHandler>")
            .finish()
    }
}

/// SSH client handler.
///
/// Accepts every server host key: the credential responder answers "yes" to
/// the trust prompt.
#[derive(Debug, Clone)]
pub struct ClientHandler {
    hostname: String,
    credentials: CredentialResponder,
}

impl ClientHandler {
    pub fn new(hostname: String, credentials: CredentialResponder) -> Self {
        Self {
            hostname,
            credentials,
        }
    }
}

impl Handler for ClientHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(self.credentials.prompt_yes_no(&format!(
            "Host key for {} is not verified, accepting",
            self.hostname
        )))
    }
}
