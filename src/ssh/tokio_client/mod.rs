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

//! russh-backed implementation of the sampler transport.
//!
//! * [`RusshTransport`] resolves the host, performs the handshake and
//!   authenticates in the fixed order publickey, keyboard-interactive,
//!   password.
//! * [`RusshSession`] opens `exec` and `sftp` channels on the connection.
//! * [`RusshExecChannel`] demultiplexes stdout/stderr of a running command
//!   into two independent byte streams.
//! * [`RusshSftpChannel`] maps file operations onto russh-sftp.
//!
//! Host keys are never verified; see [`ClientHandler`].

pub mod authentication;
pub mod channel_manager;
pub mod connection;
pub mod file_transfer;

pub use channel_manager::RusshExecChannel;
pub use connection::{ClientHandler, RusshSession, RusshTransport};
pub use file_transfer::{format_long_name, RusshSftpChannel};
