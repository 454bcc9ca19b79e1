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

//! Single sftp operations: get, put, ls, rm, rmdir, mkdir, rename.

use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::lines::drain_lines;
use super::outcome::{ChannelKind, ExecutionOutcome, SampleError, TimingRecorder};
use crate::config::expand_tilde;
use crate::ssh::{ConnectFailure, Error, SftpChannel, SshSession};

/// The sftp action to perform.
///
/// Parsing is case-insensitive and never fails; anything unrecognised is kept
/// as [`TransferAction::Unknown`] and executes as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransferAction {
    Get,
    Put,
    Ls,
    Rm,
    Rmdir,
    Mkdir,
    Rename,
    Unknown(String),
}

impl TransferAction {
    pub fn as_str(&self) -> &str {
        match self {
            TransferAction::Get => "get",
            TransferAction::Put => "put",
            TransferAction::Ls => "ls",
            TransferAction::Rm => "rm",
            TransferAction::Rmdir => "rmdir",
            TransferAction::Mkdir => "mkdir",
            TransferAction::Rename => "rename",
            TransferAction::Unknown(action) => action,
        }
    }
}

impl FromStr for TransferAction {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "get" => TransferAction::Get,
            "put" => TransferAction::Put,
            "ls" => TransferAction::Ls,
            "rm" => TransferAction::Rm,
            "rmdir" => TransferAction::Rmdir,
            "mkdir" => TransferAction::Mkdir,
            "rename" => TransferAction::Rename,
            _ => TransferAction::Unknown(s.to_string()),
        })
    }
}

impl From<String> for TransferAction {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(action) => action,
            Err(never) => match never {},
        }
    }
}

impl From<TransferAction> for String {
    fn from(action: TransferAction) -> Self {
        action.as_str().to_string()
    }
}

impl fmt::Display for TransferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub action: TransferAction,
    pub source: String,
    /// Only read by get (without print), put and rename.
    pub destination: String,
    /// For get: put the file content into the payload instead of writing `destination`.
    pub print_content: bool,
}

impl TransferRequest {
    pub fn new(action: TransferAction, source: impl Into<String>) -> Self {
        Self {
            action,
            source: source.into(),
            destination: String::new(),
            print_content: true,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn with_print_content(mut self, print_content: bool) -> Self {
        self.print_content = print_content;
        self
    }

    /// `"<action> <source>"`, recorded as the request payload of the sample.
    pub fn describe(&self) -> String {
        format!("{} {}", self.action, self.source)
    }
}

/// Runs one sftp action on an established session.
#[derive(Debug, Clone, Default)]
pub struct FileTransferExecutor;

impl FileTransferExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Executes `request`; every error becomes a failed outcome.
    pub async fn execute(
        &self,
        session: Result<&mut dyn SshSession, &ConnectFailure>,
        request: &TransferRequest,
    ) -> ExecutionOutcome {
        let session = match session {
            Ok(session) => session,
            Err(failure) => return ExecutionOutcome::connection_failed(failure),
        };

        let timer = TimingRecorder::start();
        let mut payload = String::new();
        let result = run(session, request, &mut payload).await;
        let timing = timer.finish();

        match result {
            Ok(()) => ExecutionOutcome::success(payload, timing),
            Err(e) => {
                let error = SampleError::classify(ChannelKind::Sftp, &e);
                debug!("SFTP {} failed: {}", request.describe(), error);
                ExecutionOutcome::failure(&error, payload, timing)
            }
        }
    }
}

async fn run(
    session: &mut dyn SshSession,
    request: &TransferRequest,
    payload: &mut String,
) -> Result<(), Error> {
    let mut channel = session.open_sftp().await?;
    let result = dispatch(channel.as_mut(), request, payload).await;

    if let Err(e) = channel.close().await {
        debug!("Failed to close sftp channel: {}", e);
    }
    result
}

async fn dispatch(
    channel: &mut dyn SftpChannel,
    request: &TransferRequest,
    payload: &mut String,
) -> Result<(), Error> {
    let source = request.source.as_str();
    let destination = request.destination.as_str();

    match &request.action {
        TransferAction::Get if request.print_content => {
            let reader = channel.open_read(source).await?;
            drain_lines(reader, payload).await?;
        }
        TransferAction::Get => {
            let local = expand_tilde(Path::new(destination));
            channel.download(source, &local).await?;
        }
        TransferAction::Put => {
            let local = expand_tilde(Path::new(source));
            channel.upload(&local, destination).await?;
        }
        TransferAction::Ls => {
            for entry in channel.list(source).await? {
                payload.push_str(&entry.long_name);
                payload.push('\n');
            }
        }
        TransferAction::Rm => channel.remove_file(source).await?,
        TransferAction::Rmdir => channel.remove_dir(source).await?,
        TransferAction::Mkdir => channel.create_dir(source).await?,
        TransferAction::Rename => channel.rename(source, destination).await?,
        TransferAction::Unknown(action) => {
            warn!("Unsupported SFTP action '{}', nothing to do", action);
        }
    }
    Ok(())
}
