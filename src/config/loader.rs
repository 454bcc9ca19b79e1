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

//! Configuration loading.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tokio::fs;

use super::types::Config;
use super::utils::expand_tilde;

impl Config {
    /// `config.yaml` in the platform config directory
    /// (`~/.config/ssh-sampler/config.yaml` on Linux).
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ssh-sampler").map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Load configuration from a file that must exist.
    pub async fn load(path: &Path) -> Result<Self> {
        let expanded_path = expand_tilde(path);

        let content = fs::read_to_string(&expanded_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to read configuration file at {}",
                    expanded_path.display()
                )
            })?;

        Self::parse(&content).with_context(|| {
            format!(
                "Failed to parse YAML configuration file at {}. Please check the YAML syntax is valid.",
                expanded_path.display()
            )
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load the explicitly requested file, or the default one if present.
    ///
    /// A missing explicit file is an error; a missing default file yields the
    /// built-in defaults.
    pub async fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!("Using configuration file {:?}", path);
            return Self::load(path).await;
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Using default configuration file {:?}", path);
                Self::load(&path).await
            }
            _ => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}
