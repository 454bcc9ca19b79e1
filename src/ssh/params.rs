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

//! Per-sampler connection parameters.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Default SSH port.
pub const DEFAULT_PORT: u16 = 22;

/// Default handshake timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// Immutable connection settings shared by every sample of one sampler.
///
/// Empty strings mean "not configured", so a sampler can be built from a
/// config file where every field is optional. When both a password and a
/// private key are set, the key is offered first.
#[derive(Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Zeroizing<String>,
    pub private_key_path: String,
    pub passphrase: Zeroizing<String>,
    pub connect_timeout_ms: u64,
}

impl ConnectionParams {
    pub fn new(host: impl Into<String>, port: u16, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Zeroizing::new(password.into());
        self
    }

    pub fn with_private_key(
        mut self,
        path: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.private_key_path = path.into();
        self.passphrase = Zeroizing::new(passphrase.into());
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// The configured private key, if any.
    pub fn private_key(&self) -> Option<&Path> {
        if self.private_key_path.is_empty() {
            None
        } else {
            Some(Path::new(&self.private_key_path))
        }
    }

    pub fn has_private_key(&self) -> bool {
        !self.private_key_path.is_empty()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// `user@host:port`, used in sample labels and log lines.
    pub fn destination(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    /// Private key path with a leading `~` expanded against `$HOME`.
    pub fn expanded_private_key(&self) -> Option<PathBuf> {
        self.private_key().map(crate::config::expand_tilde)
    }
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: Zeroizing::new(String::new()),
            private_key_path: String::new(),
            passphrase: Zeroizing::new(String::new()),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("private_key_path", &self.private_key_path)
            .field("passphrase", &redacted(&self.passphrase))
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}
