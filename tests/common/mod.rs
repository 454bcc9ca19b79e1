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

//! In-memory fakes of the transport traits used by the integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor};
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt, ReadBuf};

use ssh_sampler::ssh::{
    BoxedReader, ConnectionParams, CredentialResponder, Error, ExecChannel, ExecStreams,
    RemoteEntry, SessionManager, SftpChannel, SshSession, SshTransport,
};

/// Counts every lifecycle event the fakes see.
#[derive(Debug, Default)]
pub struct Counters {
    pub connect_attempts: AtomicUsize,
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub exec_opened: AtomicUsize,
    pub exec_closed: AtomicUsize,
    pub pty_requests: AtomicUsize,
    pub sftp_opened: AtomicUsize,
    pub sftp_closed: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub fn channels_opened(&self) -> usize {
        Self::get(&self.exec_opened) + Self::get(&self.sftp_opened)
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

/// What the remote command "prints" and how it ends.
#[derive(Debug, Clone, Default)]
pub struct ExecScript {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_status: Option<u32>,
    /// `is_closed` reports false this many times before the channel closes.
    pub open_polls: usize,
    /// Stdout fails with a connection reset after its data.
    pub stdout_breaks: bool,
    /// `exec` itself is refused.
    pub refuse_exec: bool,
    /// Serve output through bounded pipes of this size: the remote writes
    /// all of stderr before any stdout, blocking while a pipe is full.
    pub pipe_capacity: Option<usize>,
}

impl ExecScript {
    pub fn new(stdout: &str, stderr: &str, exit_status: u32) -> Self {
        Self {
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
            exit_status: Some(exit_status),
            ..Self::default()
        }
    }
}

/// Remote filesystem of the fake sftp server. Paths are absolute and unnormalised.
#[derive(Debug, Default)]
pub struct FakeFs {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeSet<String>,
}

impl FakeFs {
    pub fn with_root() -> Self {
        let mut fs = Self::default();
        fs.dirs.insert("/".to_string());
        fs
    }

    pub fn add_dir(&mut self, path: &str) {
        self.dirs.insert(path.to_string());
    }

    pub fn add_file(&mut self, path: &str, content: &str) {
        self.files.insert(path.to_string(), content.as_bytes().to_vec());
    }

    fn children(&self, dir: &str) -> Vec<RemoteEntry> {
        let prefix = if dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{dir}/")
        };
        let child_name = |path: &str| -> Option<String> {
            let rest = path.strip_prefix(&prefix)?;
            (!rest.is_empty() && !rest.contains('/')).then(|| rest.to_string())
        };

        let mut entries: Vec<RemoteEntry> = self
            .dirs
            .iter()
            .filter_map(|path| child_name(path))
            .map(|name| RemoteEntry {
                long_name: format!("drwxr-xr-x 1 0 0 0 Jan  1 00:00 {name}"),
                name,
            })
            .chain(self.files.iter().filter_map(|(path, data)| {
                child_name(path).map(|name| RemoteEntry {
                    long_name: format!("-rw-r--r-- 1 0 0 {} Jan  1 00:00 {name}", data.len()),
                    name,
                })
            }))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

fn no_such_file() -> Error {
    Error::SftpStatus {
        code: "NoSuchFile".to_string(),
        message: "No such file".to_string(),
    }
}

fn failure(message: &str) -> Error {
    Error::SftpStatus {
        code: "Failure".to_string(),
        message: message.to_string(),
    }
}

/// Transport whose sessions run scripted commands against an in-memory filesystem.
pub struct FakeTransport {
    pub counters: Arc<Counters>,
    pub script: ExecScript,
    pub fs: Arc<Mutex<FakeFs>>,
    pub reject_auth: Option<String>,
    pub connect_delay: Option<Duration>,
}

impl FakeTransport {
    pub fn new(script: ExecScript) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            script,
            fs: Arc::new(Mutex::new(FakeFs::with_root())),
            reject_auth: None,
            connect_delay: None,
        }
    }

    pub fn with_fs(fs: FakeFs) -> Self {
        let mut transport = Self::new(ExecScript::default());
        transport.fs = Arc::new(Mutex::new(fs));
        transport
    }

    pub fn rejecting(reason: &str) -> Self {
        let mut transport = Self::new(ExecScript::default());
        transport.reject_auth = Some(reason.to_string());
        transport
    }

    /// Session manager over this transport, plus handles to inspect it afterwards.
    pub fn into_manager(self) -> (SessionManager, Arc<Counters>, Arc<Mutex<FakeFs>>) {
        let counters = Arc::clone(&self.counters);
        let fs = Arc::clone(&self.fs);
        (SessionManager::new(Arc::new(self)), counters, fs)
    }
}

#[async_trait]
impl SshTransport for FakeTransport {
    async fn connect(
        &self,
        _params: &ConnectionParams,
        _credentials: &CredentialResponder,
    ) -> Result<Box<dyn SshSession>, Error> {
        bump(&self.counters.connect_attempts);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.reject_auth {
            return Err(Error::AuthenticationFailed(reason.clone()));
        }
        bump(&self.counters.sessions_opened);
        Ok(Box::new(FakeSession {
            counters: Arc::clone(&self.counters),
            script: self.script.clone(),
            fs: Arc::clone(&self.fs),
            closed: false,
        }))
    }
}

pub struct FakeSession {
    pub counters: Arc<Counters>,
    pub script: ExecScript,
    pub fs: Arc<Mutex<FakeFs>>,
    pub closed: bool,
}

#[async_trait]
impl SshSession for FakeSession {
    async fn open_exec(&mut self) -> Result<Box<dyn ExecChannel>, Error> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        bump(&self.counters.exec_opened);
        Ok(Box::new(FakeExecChannel {
            counters: Arc::clone(&self.counters),
            script: self.script.clone(),
            started: false,
            polls: AtomicUsize::new(0),
        }))
    }

    async fn open_sftp(&mut self) -> Result<Box<dyn SftpChannel>, Error> {
        if self.closed {
            return Err(Error::SessionClosed);
        }
        bump(&self.counters.sftp_opened);
        Ok(Box::new(FakeSftp {
            counters: Arc::clone(&self.counters),
            fs: Arc::clone(&self.fs),
        }))
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        if !self.closed {
            self.closed = true;
            bump(&self.counters.sessions_closed);
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

pub struct FakeExecChannel {
    counters: Arc<Counters>,
    script: ExecScript,
    started: bool,
    polls: AtomicUsize,
}

#[async_trait]
impl ExecChannel for FakeExecChannel {
    async fn request_pty(&mut self) -> Result<(), Error> {
        bump(&self.counters.pty_requests);
        Ok(())
    }

    async fn exec(&mut self, _command: &str) -> Result<ExecStreams, Error> {
        if self.script.refuse_exec {
            return Err(Error::ChannelRequestRefused("exec"));
        }
        if self.started {
            return Err(Error::ChannelAlreadyStarted);
        }
        self.started = true;

        if let Some(capacity) = self.script.pipe_capacity {
            return Ok(piped_streams(&self.script, capacity));
        }

        let stdout: BoxedReader = if self.script.stdout_breaks {
            Box::new(BreakingReader {
                data: Some(self.script.stdout.clone()),
            })
        } else {
            Box::new(Cursor::new(self.script.stdout.clone()))
        };
        Ok(ExecStreams {
            stdout,
            stderr: Box::new(Cursor::new(self.script.stderr.clone())),
        })
    }

    fn is_closed(&self) -> bool {
        self.started && self.polls.fetch_add(1, Ordering::SeqCst) >= self.script.open_polls
    }

    fn exit_status(&self) -> Option<u32> {
        self.script.exit_status
    }

    async fn close(&mut self) -> Result<(), Error> {
        bump(&self.counters.exec_closed);
        Ok(())
    }
}

fn piped_streams(script: &ExecScript, capacity: usize) -> ExecStreams {
    let (mut stdout_tx, stdout_rx) = tokio::io::duplex(capacity);
    let (mut stderr_tx, stderr_rx) = tokio::io::duplex(capacity);
    let stdout = script.stdout.clone();
    let stderr = script.stderr.clone();

    tokio::spawn(async move {
        if stderr_tx.write_all(&stderr).await.is_ok() {
            drop(stderr_tx);
            let _ = stdout_tx.write_all(&stdout).await;
        }
    });

    ExecStreams {
        stdout: Box::new(stdout_rx),
        stderr: Box::new(stderr_rx),
    }
}

/// Hands out its data once, then fails with a connection reset.
struct BreakingReader {
    data: Option<Vec<u8>>,
}

impl AsyncRead for BreakingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.data.take() {
            Some(data) => {
                buf.put_slice(&data);
                Poll::Ready(Ok(()))
            }
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
        }
    }
}

pub struct FakeSftp {
    counters: Arc<Counters>,
    fs: Arc<Mutex<FakeFs>>,
}

impl FakeSftp {
    fn fs(&self) -> std::sync::MutexGuard<'_, FakeFs> {
        self.fs.lock().unwrap()
    }
}

#[async_trait]
impl SftpChannel for FakeSftp {
    async fn open_read(&mut self, path: &str) -> Result<BoxedReader, Error> {
        let data = self.fs().files.get(path).cloned().ok_or_else(no_such_file)?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn download(&mut self, remote: &str, local: &Path) -> Result<(), Error> {
        let data = self.fs().files.get(remote).cloned().ok_or_else(no_such_file)?;
        tokio::fs::write(local, data).await?;
        Ok(())
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), Error> {
        let data = tokio::fs::read(local).await?;
        self.fs().files.insert(remote.to_string(), data);
        Ok(())
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, Error> {
        let fs = self.fs();
        if !fs.dirs.contains(path) {
            return Err(no_such_file());
        }
        Ok(fs.children(path))
    }

    async fn remove_file(&mut self, path: &str) -> Result<(), Error> {
        self.fs().files.remove(path).map(|_| ()).ok_or_else(no_such_file)
    }

    async fn remove_dir(&mut self, path: &str) -> Result<(), Error> {
        let mut fs = self.fs();
        if !fs.dirs.contains(path) {
            return Err(no_such_file());
        }
        if !fs.children(path).is_empty() {
            return Err(failure("Directory not empty"));
        }
        fs.dirs.remove(path);
        Ok(())
    }

    async fn create_dir(&mut self, path: &str) -> Result<(), Error> {
        let mut fs = self.fs();
        if fs.dirs.contains(path) || fs.files.contains_key(path) {
            return Err(failure("File already exists"));
        }
        fs.dirs.insert(path.to_string());
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), Error> {
        let mut fs = self.fs();
        let data = fs.files.remove(from).ok_or_else(no_such_file)?;
        fs.files.insert(to.to_string(), data);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        bump(&self.counters.sftp_closed);
        Ok(())
    }
}

pub fn params() -> ConnectionParams {
    ConnectionParams::new("sut.example", 22, "bench").with_password("s3cret")
}
