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

//! Transport-level errors raised by SSH sessions and channels.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the SSH transport and its channels.
///
/// The variants are grouped the way samplers classify them: everything up to
/// [`Error::AuthenticationFailed`] can only happen while connecting, the rest
/// happen on a live session.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Connection timed out after {} ms", .0.as_millis())]
    ConnectTimeout(Duration),

    #[error("Failed to load private key {path}: {source}")]
    KeyInvalid {
        path: String,
        #[source]
        source: russh::keys::Error,
    },

    #[error("Auth fail: {0}")]
    AuthenticationFailed(String),

    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// The remote sftp server refused the request (missing path, permission, ...).
    #[error("{message}")]
    SftpStatus { code: String, message: String },

    /// The sftp subsystem misbehaved at the protocol level.
    #[error("SFTP protocol error: {0}")]
    SftpProtocol(String),

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("Session is closed")]
    SessionClosed,

    #[error("Command already dispatched on this channel")]
    ChannelAlreadyStarted,

    /// The server answered a channel request with a failure, or closed the
    /// channel without answering.
    #[error("Server refused {0} request")]
    ChannelRequestRefused(&'static str),
}

impl Error {
    /// Whether this error came from the remote filesystem rather than the transport.
    pub fn is_sftp_status(&self) -> bool {
        matches!(self, Error::SftpStatus { .. })
    }

    /// Whether this error is a read/write failure on a byte stream.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

impl From<russh_sftp::client::error::Error> for Error {
    fn from(e: russh_sftp::client::error::Error) -> Self {
        use russh_sftp::client::error::Error as SftpError;

        match e {
            SftpError::Status(status) => Error::SftpStatus {
                code: format!("{:?}", status.status_code),
                message: status.error_message,
            },
            SftpError::IO(msg) => Error::Io(io::Error::other(msg)),
            other => Error::SftpProtocol(other.to_string()),
        }
    }
}
