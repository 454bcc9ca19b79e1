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

//! The call-level contract samplers need from an SSH client library.
//!
//! [`crate::ssh::tokio_client::RusshTransport`] implements it on top of
//! russh and russh-sftp; tests implement it with in-memory doubles.

use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncRead;

use super::auth::CredentialResponder;
use super::error::Error;
use super::params::ConnectionParams;

/// An owned, type-erased byte stream.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Client context able to open authenticated sessions.
///
/// A single transport is typically shared (behind an `Arc`) by every sampler
/// in a process; it must not keep per-session state.
#[async_trait]
pub trait SshTransport: Send + Sync {
    /// Resolve, handshake and authenticate, giving up after the configured
    /// connect timeout.
    async fn connect(
        &self,
        params: &ConnectionParams,
        credentials: &CredentialResponder,
    ) -> Result<Box<dyn SshSession>, Error>;
}

/// One authenticated connection.
#[async_trait]
pub trait SshSession: Send {
    async fn open_exec(&mut self) -> Result<Box<dyn ExecChannel>, Error>;

    async fn open_sftp(&mut self) -> Result<Box<dyn SftpChannel>, Error>;

    /// Close the connection. Calling this on a closed session is a no-op.
    async fn disconnect(&mut self) -> Result<(), Error>;

    fn is_closed(&self) -> bool;
}

/// Output streams of a started exec channel.
pub struct ExecStreams {
    pub stdout: BoxedReader,
    pub stderr: BoxedReader,
}

/// A session channel used to run one remote command.
#[async_trait]
pub trait ExecChannel: Send {
    /// Allocate a pseudo terminal. Must be called before [`ExecChannel::exec`].
    async fn request_pty(&mut self) -> Result<(), Error>;

    /// Dispatch the command and hand back its output streams.
    async fn exec(&mut self, command: &str) -> Result<ExecStreams, Error>;

    /// Whether the remote side has closed the channel.
    fn is_closed(&self) -> bool;

    /// Exit status reported by the remote command, once known.
    fn exit_status(&self) -> Option<u32>;

    async fn close(&mut self) -> Result<(), Error>;
}

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    /// `ls -l` style rendering of the entry.
    pub long_name: String,
}

/// A channel running the sftp subsystem.
#[async_trait]
pub trait SftpChannel: Send {
    /// Open a remote file for streaming reads.
    async fn open_read(&mut self, path: &str) -> Result<BoxedReader, Error>;

    /// Copy a remote file to local storage.
    async fn download(&mut self, remote: &str, local: &Path) -> Result<(), Error>;

    /// Copy a local file to the remote side, replacing any existing file.
    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), Error>;

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, Error>;

    async fn remove_file(&mut self, path: &str) -> Result<(), Error>;

    async fn remove_dir(&mut self, path: &str) -> Result<(), Error>;

    async fn create_dir(&mut self, path: &str) -> Result<(), Error>;

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), Error>;

    async fn close(&mut self) -> Result<(), Error>;
}
