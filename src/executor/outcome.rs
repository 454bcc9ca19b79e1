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

//! Execution outcomes and the failure taxonomy shared by both executors.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ssh::{ConnectFailure, Error};

/// Response code/message for a successful operation with no exit code to report.
pub const RESPONSE_OK: &str = "OK";
pub const CONNECTION_FAILED: &str = "Connection Failed";
pub const EXEC_CHANNEL_ERROR: &str = "ExecChannelError";
pub const SFTP_CHANNEL_ERROR: &str = "SftpChannelError";
pub const IO_ERROR: &str = "IOError";
pub const SFTP_ERROR: &str = "SftpError";

/// Which kind of channel a protocol failure happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Exec,
    Sftp,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Exec => write!(f, "exec"),
            ChannelKind::Sftp => write!(f, "sftp"),
        }
    }
}

/// Why a sample failed.
///
/// The `Display` output is the human-readable response message; it is the
/// underlying library's message passed through unchanged, except for
/// connection failures which carry the failure reason behind a fixed prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("Failed to connect to server: {reason}")]
    ConnectFailed { reason: String },

    #[error("{message}")]
    Protocol {
        channel: ChannelKind,
        message: String,
    },

    #[error("{message}")]
    TransportIo { message: String },

    #[error("{message}")]
    SftpOperation { message: String },
}

impl SampleError {
    /// Sorts a transport error raised while working on `channel`.
    pub fn classify(channel: ChannelKind, error: &Error) -> Self {
        let message = error.to_string();
        if error.is_sftp_status() {
            SampleError::SftpOperation { message }
        } else if error.is_io() {
            SampleError::TransportIo { message }
        } else {
            SampleError::Protocol { channel, message }
        }
    }

    /// Short machine-readable code reported alongside the message.
    pub fn response_code(&self) -> &'static str {
        match self {
            SampleError::ConnectFailed { .. } => CONNECTION_FAILED,
            SampleError::Protocol {
                channel: ChannelKind::Exec,
                ..
            } => EXEC_CHANNEL_ERROR,
            SampleError::Protocol {
                channel: ChannelKind::Sftp,
                ..
            } => SFTP_CHANNEL_ERROR,
            SampleError::TransportIo { .. } => IO_ERROR,
            SampleError::SftpOperation { .. } => SFTP_ERROR,
        }
    }
}

impl From<&ConnectFailure> for SampleError {
    fn from(failure: &ConnectFailure) -> Self {
        SampleError::ConnectFailed {
            reason: failure.reason.clone(),
        }
    }
}

/// Wall-clock bracket around the measured part of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub elapsed: Duration,
}

impl Timing {
    /// A zero-length bracket at the current instant.
    pub fn instant() -> Self {
        let now = Utc::now();
        Self {
            start: now,
            end: now,
            elapsed: Duration::ZERO,
        }
    }
}

/// Starts the clock on construction; [`TimingRecorder::finish`] stops it.
#[derive(Debug)]
pub struct TimingRecorder {
    start: DateTime<Utc>,
    started: Instant,
}

impl TimingRecorder {
    pub fn start() -> Self {
        Self {
            start: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn finish(self) -> Timing {
        let elapsed = self.started.elapsed();
        Timing {
            start: self.start,
            end: Utc::now(),
            elapsed,
        }
    }
}

/// What an executor hands back to the result assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub succeeded: bool,
    pub response_code: String,
    pub response_message: String,
    pub payload: Vec<u8>,
    pub timing: Timing,
}

impl ExecutionOutcome {
    pub fn success(payload: impl Into<Vec<u8>>, timing: Timing) -> Self {
        Self::completed(true, RESPONSE_OK, payload, timing)
    }

    /// An operation that ran to the end; `succeeded` and `response_code` are
    /// decided by the caller (exit code gating).
    pub fn completed(
        succeeded: bool,
        response_code: impl Into<String>,
        payload: impl Into<Vec<u8>>,
        timing: Timing,
    ) -> Self {
        Self {
            succeeded,
            response_code: response_code.into(),
            response_message: RESPONSE_OK.to_string(),
            payload: payload.into(),
            timing,
        }
    }

    /// A failed operation. Any partial output collected before the failure is kept.
    pub fn failure(error: &SampleError, payload: impl Into<Vec<u8>>, timing: Timing) -> Self {
        Self {
            succeeded: false,
            response_code: error.response_code().to_string(),
            response_message: error.to_string(),
            payload: payload.into(),
            timing,
        }
    }

    /// Outcome for a sample whose session never came up. No channel work is timed.
    pub fn connection_failed(failure: &ConnectFailure) -> Self {
        Self::failure(&SampleError::from(failure), Vec::new(), Timing::instant())
    }

    pub fn payload_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
