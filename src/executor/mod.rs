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

//! Executors that run one operation on an established session.
//!
//! Both executors take the session as `Result<&mut dyn SshSession, &ConnectFailure>`
//! and turn every failure into an [`ExecutionOutcome`], so callers never see
//! an error type.

pub mod command;
pub mod file_transfer;
mod lines;
pub mod outcome;

pub use command::{CaptureMode, CommandExecutor, CommandRequest, ExecState};
pub use file_transfer::{FileTransferExecutor, TransferAction, TransferRequest};
pub use lines::drain_lines;
pub use outcome::{ChannelKind, ExecutionOutcome, SampleError, Timing, TimingRecorder};
