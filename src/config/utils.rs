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

//! Path and value helpers for configuration fields.

use std::path::{Path, PathBuf};

/// Expand tilde (~) in path to home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(path_str) = path.to_str() else {
        return path.to_path_buf();
    };
    let rest = match path_str {
        "~" => "",
        s if s.starts_with("~/") => &s[1..],
        _ => return path.to_path_buf(),
    };
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(format!("{home}{rest}")),
        Err(_) => path.to_path_buf(),
    }
}

/// Replace `${VAR}` references with the variable's value.
///
/// Unset variables are left in place so a typo shows up in the auth failure
/// instead of silently becoming an empty password.
pub fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            result.push_str(&rest[start..]);
            return result;
        };

        let name = &after[..end];
        let valid =
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        let value = if valid { std::env::var(name).ok() } else { None };
        match value {
            Some(value) => result.push_str(&value),
            None => {
                if valid {
                    tracing::debug!("Environment variable {} not found", name);
                }
                result.push_str(&rest[start..start + 2 + end + 1]);
            }
        }
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    result
}
