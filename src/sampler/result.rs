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

//! Sample results and the assembler that builds them from execution outcomes.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::executor::ExecutionOutcome;
use crate::ssh::ConnectionParams;

pub const CONTENT_TYPE_TEXT: &str = "text/plain";

/// One completed sample, in the shape a load-testing harness records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleResult {
    pub label: String,
    /// The command text, or `"<action> <source>"` for sftp.
    pub sampler_data: String,
    #[serde(serialize_with = "serialize_lossy")]
    pub response_data: Vec<u8>,
    pub content_type: String,
    pub successful: bool,
    pub response_code: String,
    pub response_message: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl SampleResult {
    pub fn response_data_as_string(&self) -> String {
        String::from_utf8_lossy(&self.response_data).into_owned()
    }
}

fn serialize_lossy<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

/// `"<name>:(<user>@<host>:<port>)"`
pub fn sample_label(name: &str, params: &ConnectionParams) -> String {
    format!("{}:({})", name, params.destination())
}

/// Maps an [`ExecutionOutcome`] onto a [`SampleResult`].
#[derive(Debug, Clone)]
pub struct ResultAssembler {
    label: String,
    sampler_data: String,
}

impl ResultAssembler {
    pub fn new(name: &str, params: &ConnectionParams, sampler_data: impl Into<String>) -> Self {
        Self {
            label: sample_label(name, params),
            sampler_data: sampler_data.into(),
        }
    }

    pub fn assemble(self, outcome: ExecutionOutcome) -> SampleResult {
        let timing = outcome.timing;
        SampleResult {
            label: self.label,
            sampler_data: self.sampler_data,
            response_data: outcome.payload,
            content_type: CONTENT_TYPE_TEXT.to_string(),
            successful: outcome.succeeded,
            response_code: outcome.response_code,
            response_message: outcome.response_message,
            start_time: timing.start,
            end_time: timing.end,
            elapsed_ms: u64::try_from(timing.elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{SampleError, Timing};

    fn params() -> ConnectionParams {
        ConnectionParams::new("web-3", 2022, "bench")
    }

    #[test]
    fn test_label_format() {
        assert_eq!(
            sample_label("SSH Command Sampler", &params()),
            "SSH Command Sampler:(bench@web-3:2022)"
        );
    }

    #[test]
    fn test_assemble_success() {
        let outcome = ExecutionOutcome::completed(true, "0", "a\nb\n", Timing::instant());
        let result = ResultAssembler::new("probe", &params(), "ls -1").assemble(outcome);

        assert_eq!(result.label, "probe:(bench@web-3:2022)");
        assert_eq!(result.sampler_data, "ls -1");
        assert_eq!(result.response_data_as_string(), "a\nb\n");
        assert_eq!(result.content_type, "text/plain");
        assert!(result.successful);
        assert_eq!(result.response_code, "0");
        assert_eq!(result.response_message, "OK");
        assert_eq!(result.elapsed_ms, 0);
    }

    #[test]
    fn test_assemble_failure() {
        let error = SampleError::SftpOperation {
            message: "No such file".into(),
        };
        let outcome = ExecutionOutcome::failure(&error, Vec::new(), Timing::instant());
        let result = ResultAssembler::new("probe", &params(), "rm /x").assemble(outcome);

        assert!(!result.successful);
        assert_eq!(result.response_code, "SftpError");
        assert_eq!(result.response_message, "No such file");
    }

    #[test]
    fn test_json_renders_payload_as_text() {
        let outcome = ExecutionOutcome::success("hello\n", Timing::instant());
        let result = ResultAssembler::new("probe", &params(), "get /f").assemble(outcome);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["response_data"], "hello\n");
        assert_eq!(json["successful"], true);
        assert_eq!(json["response_code"], "OK");
    }
}
