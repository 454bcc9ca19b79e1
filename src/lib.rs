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

//! Single-operation SSH samplers for load-testing harnesses.
//!
//! A sample opens one SSH session, runs exactly one operation on it (a remote
//! command, or one SFTP action), closes the session and reports a
//! [`sampler::SampleResult`] with a label, response data, success flag,
//! response code and timing of the channel work.
//!
//! The transport is abstracted behind the [`ssh::SshTransport`] trait family;
//! [`ssh::tokio_client`] implements it with russh and russh-sftp.

pub mod cli;
pub mod config;
pub mod executor;
pub mod sampler;
pub mod ssh;
pub mod utils;
