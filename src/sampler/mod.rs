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

//! Samplers: one connect / operate / disconnect cycle per call.
//!
//! A sampler owns its connection parameters and request. Every call to
//! [`Sampler::sample`] opens a fresh session, runs exactly one operation on
//! it, tears the session down and returns a [`SampleResult`]. Failures never
//! escape as errors; they are reported through the result's success flag and
//! response code.

pub mod command;
pub mod result;
pub mod sftp;

use async_trait::async_trait;

pub use command::{CommandSampler, DEFAULT_COMMAND_SAMPLER_NAME};
pub use result::{sample_label, ResultAssembler, SampleResult, CONTENT_TYPE_TEXT};
pub use sftp::{SftpSampler, DEFAULT_SFTP_SAMPLER_NAME};

#[async_trait]
pub trait Sampler: Send + Sync {
    fn name(&self) -> &str;

    async fn sample(&self) -> SampleResult;
}
