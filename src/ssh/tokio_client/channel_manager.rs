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

//! Exec channel on top of a russh session channel.
//!
//! russh delivers stdout, stderr and status messages on a single message
//! queue. Once the server accepts the command a pump task drains that queue
//! and forwards the two data streams into separate in-memory pipes, so
//! callers can read stdout and stderr independently. The pipes reach
//! end-of-stream when the remote side closes the channel.

use async_trait::async_trait;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::ssh::error::Error;
use crate::ssh::transport::{ExecChannel, ExecStreams};

/// Capacity of each stdout/stderr pipe.
/// - 8KB matches typical SSH channel packet sizes
/// - a full pipe applies backpressure to the pump until the reader catches up
const PIPE_CAPACITY: usize = 8192;

/// Terminal requested when a PTY is asked for.
const PTY_TERM: &str = "vt100";
const PTY_COLUMNS: u32 = 80;
const PTY_ROWS: u32 = 24;

/// Upper bound on waiting for the pump after requesting a close.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Message queue of one channel.
#[async_trait]
trait ChannelEvents: Send {
    /// Next message, or `None` once the channel is gone.
    async fn next(&mut self) -> Option<ChannelMsg>;

    async fn close(&mut self) -> Result<(), Error>;
}

#[async_trait]
impl ChannelEvents for Channel<Msg> {
    async fn next(&mut self) -> Option<ChannelMsg> {
        self.wait().await
    }

    async fn close(&mut self) -> Result<(), Error> {
        Channel::close(self).await.map_err(Error::Ssh)
    }
}

/// Remote-side channel state published by the pump task.
#[derive(Debug, Default)]
struct RemoteState {
    closed: AtomicBool,
    exit_status: OnceLock<u32>,
}

/// A session channel running one command.
pub struct RusshExecChannel {
    /// Present until the command is dispatched, then owned by the pump.
    channel: Option<Channel<Msg>>,
    /// Messages that arrived while waiting for a request reply.
    backlog: VecDeque<ChannelMsg>,
    state: Arc<RemoteState>,
    close_tx: Option<oneshot::Sender<()>>,
    pump: Option<JoinHandle<()>>,
}

impl RusshExecChannel {
    pub fn new(channel: Channel<Msg>) -> Self {
        Self {
            channel: Some(channel),
            backlog: VecDeque::new(),
            state: Arc::new(RemoteState::default()),
            close_tx: None,
            pump: None,
        }
    }

    fn idle_channel(&mut self) -> Result<&mut Channel<Msg>, Error> {
        self.channel.as_mut().ok_or(Error::ChannelAlreadyStarted)
    }
}

#[async_trait]
impl ExecChannel for RusshExecChannel {
    async fn request_pty(&mut self) -> Result<(), Error> {
        let channel = self.idle_channel()?;
        channel
            .request_pty(true, PTY_TERM, PTY_COLUMNS, PTY_ROWS, 0, 0, &[])
            .await?;

        let mut backlog = VecDeque::new();
        let reply = await_reply(channel, &mut backlog, "pty").await;
        self.backlog.extend(backlog);
        reply
    }

    async fn exec(&mut self, command: &str) -> Result<ExecStreams, Error> {
        let mut channel = self
            .channel
            .take()
            .ok_or(Error::ChannelAlreadyStarted)?;
        channel.exec(true, command).await?;

        let mut backlog = std::mem::take(&mut self.backlog);
        if let Err(e) = await_reply(&mut channel, &mut backlog, "exec").await {
            self.state.closed.store(true, Ordering::Release);
            if let Err(close_err) = channel.close().await {
                tracing::debug!("Failed to close refused exec channel: {}", close_err);
            }
            return Err(e);
        }

        let (stdout_tx, stdout_rx) = tokio::io::duplex(PIPE_CAPACITY);
        let (stderr_tx, stderr_rx) = tokio::io::duplex(PIPE_CAPACITY);
        let (close_tx, close_rx) = oneshot::channel();

        self.close_tx = Some(close_tx);
        self.pump = Some(tokio::spawn(pump(
            channel,
            backlog,
            stdout_tx,
            stderr_tx,
            Arc::clone(&self.state),
            close_rx,
        )));

        Ok(ExecStreams {
            stdout: Box::new(stdout_rx),
            stderr: Box::new(stderr_rx),
        })
    }

    fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    fn exit_status(&self) -> Option<u32> {
        self.state.exit_status.get().copied()
    }

    async fn close(&mut self) -> Result<(), Error> {
        if let Some(channel) = self.channel.take() {
            // Never dispatched
            self.state.closed.store(true, Ordering::Release);
            return channel.close().await.map_err(Error::Ssh);
        }

        if let Some(close_tx) = self.close_tx.take() {
            let _ = close_tx.send(());
        }
        if let Some(pump) = self.pump.take() {
            let abort = pump.abort_handle();
            if tokio::time::timeout(CLOSE_GRACE, pump).await.is_err() {
                tracing::warn!("Exec channel did not close within {:?}", CLOSE_GRACE);
                abort.abort();
                self.state.closed.store(true, Ordering::Release);
            }
        }
        Ok(())
    }
}

impl Drop for RusshExecChannel {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

/// Wait for the server's answer to a channel request sent with `want_reply`.
///
/// Anything else arriving first is kept in `backlog` for the pump.
async fn await_reply<C: ChannelEvents>(
    channel: &mut C,
    backlog: &mut VecDeque<ChannelMsg>,
    request: &'static str,
) -> Result<(), Error> {
    loop {
        match channel.next().await {
            Some(ChannelMsg::Success) => return Ok(()),
            Some(ChannelMsg::Failure) => {
                tracing::debug!("Server refused {} request", request);
                return Err(Error::ChannelRequestRefused(request));
            }
            Some(msg) => backlog.push_back(msg),
            None => return Err(Error::ChannelRequestRefused(request)),
        }
    }
}

/// Forward channel data into the pipes until the remote closes the channel.
///
/// The pipes are only shut once the message queue ends: EOF may arrive
/// before the last data packet, and the exit status may arrive after EOF.
async fn pump<C: ChannelEvents>(
    mut channel: C,
    mut backlog: VecDeque<ChannelMsg>,
    stdout_tx: DuplexStream,
    stderr_tx: DuplexStream,
    state: Arc<RemoteState>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let mut stdout_tx = Some(stdout_tx);
    let mut stderr_tx = Some(stderr_tx);
    let mut close_requested = false;

    loop {
        let msg = if let Some(early) = backlog.pop_front() {
            Some(early)
        } else {
            tokio::select! {
                msg = channel.next() => msg,
                _ = &mut close_rx, if !close_requested => {
                    close_requested = true;
                    if let Err(e) = channel.close().await {
                        tracing::debug!("Failed to close exec channel: {}", e);
                        break;
                    }
                    continue;
                }
            }
        };

        match msg {
            Some(ChannelMsg::Data { ref data }) => forward(&mut stdout_tx, data).await,
            Some(ChannelMsg::ExtendedData { ref data, ext }) => {
                if ext == 1 {
                    forward(&mut stderr_tx, data).await;
                }
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                let _ = state.exit_status.set(exit_status);
            }
            Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                tracing::debug!("Remote command terminated by signal {:?}", signal_name);
            }
            Some(_) => {}
            None => break,
        }
    }

    // Dropping the writers signals end-of-stream to both readers
    drop(stdout_tx);
    drop(stderr_tx);
    state.closed.store(true, Ordering::Release);
}

/// Write one data packet; a reader that went away stops receiving data but
/// the channel keeps draining so the remote command is never blocked.
async fn forward(pipe: &mut Option<DuplexStream>, data: &[u8]) {
    if let Some(writer) = pipe.as_mut() {
        if writer.write_all(data).await.is_err() {
            *pipe = None;
        }
    }
}
