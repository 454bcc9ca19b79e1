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

//! Remote command execution over an exec channel.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::lines::drain_lines;
use super::outcome::{ChannelKind, ExecutionOutcome, SampleError, TimingRecorder, RESPONSE_OK};
use crate::ssh::{ConnectFailure, Error, ExecChannel, SshSession};

/// Interval between checks for the channel's closed flag once output is drained.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit code reported when the channel closed without an exit status.
pub const MISSING_EXIT_STATUS: i64 = -1;

pub const STDOUT_HEADER: &str = "=== stdout ===\n\n";
pub const STDERR_HEADER: &str = "\n\n=== stderr ===\n\n";

/// How the output of a command is captured and judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureMode {
    /// Succeed only on exit code 0 and report the exit code as response code.
    pub use_return_code: bool,
    /// Allocate a pseudo terminal before dispatching the command.
    pub use_pty: bool,
    /// Append a stderr section to the payload.
    pub include_stderr: bool,
}

impl Default for CaptureMode {
    fn default() -> Self {
        Self {
            use_return_code: true,
            use_pty: true,
            include_stderr: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub command: String,
    pub capture: CaptureMode,
}

impl CommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            capture: CaptureMode::default(),
        }
    }

    pub fn with_capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }
}

/// States a command goes through; logged at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecState {
    NotConnected,
    Connected,
    ChannelOpen,
    Executing,
    Draining,
    Closed,
    ExitStatusKnown,
}

/// Runs one command on an established session.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    poll_interval: Duration,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Executes `request` and never fails: every error becomes a failed outcome.
    ///
    /// `session` is `Err` when the connection could not be established, in
    /// which case no channel is touched and the outcome is `Connection Failed`.
    pub async fn execute(
        &self,
        session: Result<&mut dyn SshSession, &ConnectFailure>,
        request: &CommandRequest,
    ) -> ExecutionOutcome {
        let session = match session {
            Ok(session) => session,
            Err(failure) => {
                transition(ExecState::NotConnected);
                return ExecutionOutcome::connection_failed(failure);
            }
        };
        transition(ExecState::Connected);

        let timer = TimingRecorder::start();
        let mut payload = String::new();
        let result = self.run(session, request, &mut payload).await;
        let timing = timer.finish();

        match result {
            Ok(exit_code) => {
                debug!("Command '{}' exited with {}", request.command, exit_code);
                if request.capture.use_return_code {
                    ExecutionOutcome::completed(
                        exit_code == 0,
                        exit_code.to_string(),
                        payload,
                        timing,
                    )
                } else {
                    ExecutionOutcome::completed(true, RESPONSE_OK, payload, timing)
                }
            }
            Err(e) => {
                let error = SampleError::classify(ChannelKind::Exec, &e);
                debug!("Command '{}' failed: {}", request.command, error);
                ExecutionOutcome::failure(&error, payload, timing)
            }
        }
    }

    async fn run(
        &self,
        session: &mut dyn SshSession,
        request: &CommandRequest,
        payload: &mut String,
    ) -> Result<i64, Error> {
        let mut channel = session.open_exec().await?;
        transition(ExecState::ChannelOpen);

        let result = self.drive(channel.as_mut(), request, payload).await;

        if let Err(e) = channel.close().await {
            debug!("Failed to close exec channel: {}", e);
        }
        result
    }

    async fn drive(
        &self,
        channel: &mut dyn ExecChannel,
        request: &CommandRequest,
        payload: &mut String,
    ) -> Result<i64, Error> {
        if request.capture.use_pty {
            channel.request_pty().await?;
        }
        let streams = channel.exec(&request.command).await?;
        transition(ExecState::Executing);

        let mut stdout = String::new();
        let mut stderr = String::new();
        transition(ExecState::Draining);
        // Both streams are drained together so a full stderr pipe cannot stall stdout.
        let drained = tokio::try_join!(
            drain_lines(streams.stdout, &mut stdout),
            drain_lines(streams.stderr, &mut stderr),
        );

        if request.capture.include_stderr {
            payload.push_str(STDOUT_HEADER);
            payload.push_str(&stdout);
            payload.push_str(STDERR_HEADER);
            payload.push_str(&stderr);
        } else {
            payload.push_str(&stdout);
        }
        drained?;

        while !channel.is_closed() {
            tokio::time::sleep(self.poll_interval).await;
        }
        transition(ExecState::Closed);

        let exit_code = channel
            .exit_status()
            .map(i64::from)
            .unwrap_or(MISSING_EXIT_STATUS);
        transition(ExecState::ExitStatusKnown);
        Ok(exit_code)
    }
}

fn transition(state: ExecState) {
    trace!("exec state -> {:?}", state);
}
