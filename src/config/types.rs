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

//! Configuration file model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::executor::{CaptureMode, CommandRequest, TransferAction, TransferRequest};
use crate::ssh::params::{DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_PORT};
use crate::ssh::ConnectionParams;

use super::utils::expand_env_vars;

/// Root of `config.yaml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampler name used in result labels.
    pub name: Option<String>,
    pub connection: ConnectionConfig,
    pub command: CommandConfig,
    pub sftp: SftpConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub private_key: String,
    pub passphrase: String,
    pub connect_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: String::new(),
            private_key: String::new(),
            passphrase: String::new(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &str| if s.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("private_key", &self.private_key)
            .field("passphrase", &redact(&self.passphrase))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish()
    }
}

impl ConnectionConfig {
    /// Builds connection parameters, expanding `${VAR}` references in the
    /// credential fields.
    pub fn to_params(&self) -> ConnectionParams {
        ConnectionParams::new(self.host.clone(), self.port, self.username.clone())
            .with_password(expand_env_vars(&self.password))
            .with_private_key(
                expand_env_vars(&self.private_key),
                expand_env_vars(&self.passphrase),
            )
            .with_connect_timeout_ms(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub command: String,
    pub use_return_code: bool,
    pub use_tty: bool,
    pub print_stderr: bool,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            command: "date".to_string(),
            use_return_code: true,
            use_tty: true,
            print_stderr: true,
        }
    }
}

impl CommandConfig {
    pub fn to_request(&self) -> CommandRequest {
        CommandRequest::new(self.command.clone()).with_capture(CaptureMode {
            use_return_code: self.use_return_code,
            use_pty: self.use_tty,
            include_stderr: self.print_stderr,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SftpConfig {
    pub action: TransferAction,
    pub source: String,
    pub destination: String,
    pub print_file: bool,
}

impl Default for SftpConfig {
    fn default() -> Self {
        Self {
            action: TransferAction::Get,
            source: String::new(),
            destination: String::new(),
            print_file: true,
        }
    }
}

impl SftpConfig {
    pub fn to_request(&self) -> TransferRequest {
        TransferRequest::new(self.action.clone(), self.source.clone())
            .with_destination(self.destination.clone())
            .with_print_content(self.print_file)
    }
}
