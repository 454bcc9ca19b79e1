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

//! Non-interactive credential answers for SSH authentication.
//!
//! Samplers run unattended, so every question the SSH negotiation may ask
//! (password, key passphrase, keyboard-interactive prompts, host key
//! confirmation) is answered from configuration without touching a terminal.
//!
//! # Security
//!
//! [`CredentialResponder::prompt_yes_no`] always answers "yes". Together with
//! the handler in [`crate::ssh::tokio_client`] this accepts any host key:
//! load-test connections are throwaway and host key checking is disabled on
//! purpose. Do not point samplers at hosts you do not trust.

use std::fmt;
use zeroize::Zeroizing;

use super::params::ConnectionParams;

/// Authentication methods in the order they are attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethodKind {
    PublicKey,
    KeyboardInteractive,
    Password,
}

impl AuthMethodKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethodKind::PublicKey => "publickey",
            AuthMethodKind::KeyboardInteractive => "keyboard-interactive",
            AuthMethodKind::Password => "password",
        }
    }
}

impl fmt::Display for AuthMethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed preference order; callers never choose.
pub const PREFERRED_AUTH_ORDER: [AuthMethodKind; 3] = [
    AuthMethodKind::PublicKey,
    AuthMethodKind::KeyboardInteractive,
    AuthMethodKind::Password,
];

/// One keyboard-interactive prompt as sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardPrompt {
    pub prompt: String,
    /// Whether the user's answer would be echoed (i.e. it is not a secret).
    pub echo: bool,
}

impl KeyboardPrompt {
    pub fn new(prompt: impl Into<String>, echo: bool) -> Self {
        Self {
            prompt: prompt.into(),
            echo,
        }
    }
}

/// Answers credential queries from a fixed set of values.
///
/// Holds copies of only the fields it needs, so it can be shared with the
/// transport freely and is safe to call from any task.
#[derive(Clone)]
pub struct CredentialResponder {
    password: Zeroizing<String>,
    passphrase: Zeroizing<String>,
    has_private_key: bool,
}

impl CredentialResponder {
    pub fn new(password: &str, passphrase: &str, has_private_key: bool) -> Self {
        Self {
            password: Zeroizing::new(password.to_string()),
            passphrase: Zeroizing::new(passphrase.to_string()),
            has_private_key,
        }
    }

    pub fn from_params(params: &ConnectionParams) -> Self {
        Self::new(
            &params.password,
            &params.passphrase,
            params.has_private_key(),
        )
    }

    /// The configured password, or `None` when it is empty.
    pub fn password(&self) -> Option<&str> {
        if self.password.is_empty() {
            None
        } else {
            Some(self.password.as_str())
        }
    }

    /// The configured key passphrase.
    ///
    /// An empty passphrase is a valid answer for an unencrypted key, so
    /// `None` is only returned when it is empty and no key is configured.
    pub fn passphrase(&self) -> Option<&str> {
        if self.passphrase.is_empty() && !self.has_private_key {
            None
        } else {
            Some(self.passphrase.as_str())
        }
    }

    /// Answers a keyboard-interactive round.
    ///
    /// Only a single hidden prompt is answered, with the password. Anything
    /// else is refused so the transport moves on to the next method.
    pub fn keyboard_interactive(&self, prompts: &[KeyboardPrompt]) -> Option<Vec<String>> {
        let [prompt] = prompts else {
            return None;
        };
        if prompt.echo {
            return None;
        }
        self.password().map(|password| vec![password.to_string()])
    }

    /// Confirmation questions (unknown host key and similar) are always accepted.
    pub fn prompt_yes_no(&self, message: &str) -> bool {
        tracing::debug!("Auto-accepting confirmation: {}", message);
        true
    }

    /// Methods worth offering, in preference order.
    pub fn offered_methods(&self) -> Vec<AuthMethodKind> {
        PREFERRED_AUTH_ORDER
            .iter()
            .copied()
            .filter(|method| match method {
                AuthMethodKind::PublicKey => self.has_private_key,
                AuthMethodKind::KeyboardInteractive | AuthMethodKind::Password => {
                    self.password().is_some()
                }
            })
            .collect()
    }
}

impl fmt::Debug for CredentialResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialResponder")
            .field("password_set", &!self.password.is_empty())
            .field("passphrase_set", &!self.passphrase.is_empty())
            .field("has_private_key", &self.has_private_key)
            .finish()
    }
}
