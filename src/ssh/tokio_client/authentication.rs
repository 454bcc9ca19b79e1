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

//! Client authentication in the fixed publickey, keyboard-interactive,
//! password order.

use russh::client::{Handle, Handler, KeyboardInteractiveAuthResponse};
use std::path::Path;
use std::sync::Arc;

use crate::ssh::auth::{AuthMethodKind, CredentialResponder, KeyboardPrompt};
use crate::ssh::error::Error;

/// Try each method the responder offers until the server accepts one.
///
/// A private key that cannot be loaded aborts authentication.
pub(super) async fn authenticate<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    key_path: Option<&Path>,
    credentials: &CredentialResponder,
) -> Result<(), Error> {
    let mut attempted: Vec<AuthMethodKind> = Vec::new();

    for method in credentials.offered_methods() {
        let accepted = match method {
            AuthMethodKind::PublicKey => {
                let Some(path) = key_path else {
                    continue;
                };
                try_public_key(handle, username, path, credentials).await?
            }
            AuthMethodKind::KeyboardInteractive => {
                try_keyboard_interactive(handle, username, credentials).await?
            }
            AuthMethodKind::Password => {
                let password = credentials.password().unwrap_or_default();
                handle
                    .authenticate_password(username, password)
                    .await?
                    .success()
            }
        };

        attempted.push(method);
        if accepted {
            tracing::debug!("Authenticated as {} using {}", username, method);
            return Ok(());
        }
        tracing::debug!("Server rejected {} authentication for {}", method, username);
    }

    let reason = if attempted.is_empty() {
        "no password or private key configured".to_string()
    } else {
        format!(
            "server rejected {}",
            attempted
                .iter()
                .map(AuthMethodKind::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )
    };
    Err(Error::AuthenticationFailed(reason))
}

async fn try_public_key<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    key_path: &Path,
    credentials: &CredentialResponder,
) -> Result<bool, Error> {
    let passphrase = credentials.passphrase().filter(|p| !p.is_empty());
    let private_key =
        russh::keys::load_secret_key(key_path, passphrase).map_err(|source| Error::KeyInvalid {
            path: key_path.display().to_string(),
            source,
        })?;

    let result = handle
        .authenticate_publickey(
            username,
            russh::keys::PrivateKeyWithHashAlg::new(
                Arc::new(private_key),
                handle.best_supported_rsa_hash().await?.flatten(),
            ),
        )
        .await?;
    Ok(result.success())
}

async fn try_keyboard_interactive<H: Handler>(
    handle: &mut Handle<H>,
    username: &str,
    credentials: &CredentialResponder,
) -> Result<bool, Error> {
    let mut response = handle
        .authenticate_keyboard_interactive_start(username, None::<String>)
        .await?;

    loop {
        let prompts = match response {
            KeyboardInteractiveAuthResponse::Success => return Ok(true),
            KeyboardInteractiveAuthResponse::Failure { .. } => return Ok(false),
            KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => prompts,
        };

        let answers = if prompts.is_empty() {
            // Informational round, nothing to answer
            Vec::new()
        } else {
            let prompts: Vec<KeyboardPrompt> = prompts
                .into_iter()
                .map(|p| KeyboardPrompt::new(p.prompt, p.echo))
                .collect();
            match credentials.keyboard_interactive(&prompts) {
                Some(answers) => answers,
                None => {
                    tracing::debug!(
                        "Declining keyboard-interactive round with {} prompt(s)",
                        prompts.len()
                    );
                    return Ok(false);
                }
            }
        };

        response = handle
            .authenticate_keyboard_interactive_respond(answers)
            .await?;
    }
}
