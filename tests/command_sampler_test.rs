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

//! Tests for the command sampler driven through an in-memory transport.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{params, Counters, ExecScript, FakeTransport};
use ssh_sampler::executor::{CaptureMode, CommandExecutor, CommandRequest};
use ssh_sampler::sampler::{CommandSampler, Sampler};

fn quiet() -> CaptureMode {
    CaptureMode {
        use_return_code: true,
        use_pty: false,
        include_stderr: false,
    }
}

fn build(transport: FakeTransport, request: CommandRequest) -> (CommandSampler, Arc<Counters>) {
    let (manager, counters, _) = transport.into_manager();
    let sampler = CommandSampler::with_session_manager(params(), request, manager)
        .with_executor(CommandExecutor::new().with_poll_interval(Duration::from_millis(1)));
    (sampler, counters)
}

#[tokio::test]
async fn test_one_session_per_sample() {
    let (sampler, counters) = build(
        FakeTransport::new(ExecScript::new("up 3 days\n", "", 0)),
        CommandRequest::new("uptime"),
    );

    sampler.sample().await;

    assert_eq!(Counters::get(&counters.connect_attempts), 1);
    assert_eq!(Counters::get(&counters.sessions_opened), 1);
    assert_eq!(Counters::get(&counters.sessions_closed), 1);
    assert_eq!(Counters::get(&counters.exec_opened), 1);
    assert_eq!(Counters::get(&counters.exec_closed), 1);

    sampler.sample().await;
    assert_eq!(Counters::get(&counters.sessions_opened), 2);
    assert_eq!(Counters::get(&counters.sessions_closed), 2);
}

#[tokio::test]
async fn test_exit_zero_with_gating() {
    let (sampler, _) = build(
        FakeTransport::new(ExecScript::new("a\nb\n", "", 0)),
        CommandRequest::new("printf 'a\\nb\\n'").with_capture(quiet()),
    );

    let result = sampler.sample().await;

    assert!(result.successful);
    assert_eq!(result.response_code, "0");
    assert_eq!(result.response_message, "OK");
    assert_eq!(result.response_data_as_string(), "a\nb\n");
    assert_eq!(result.content_type, "text/plain");
}

#[tokio::test]
async fn test_nonzero_exit_with_gating_fails() {
    let (sampler, _) = build(
        FakeTransport::new(ExecScript::new("", "", 2)),
        CommandRequest::new("false").with_capture(quiet()),
    );

    let result = sampler.sample().await;

    assert!(!result.successful);
    assert_eq!(result.response_code, "2");
}

#[tokio::test]
async fn test_gating_disabled_always_succeeds() {
    let capture = CaptureMode {
        use_return_code: false,
        ..quiet()
    };
    let (sampler, _) = build(
        FakeTransport::new(ExecScript::new("a\nb\n", "", 1)),
        CommandRequest::new("false").with_capture(capture),
    );

    let result = sampler.sample().await;

    assert!(result.successful);
    assert_eq!(result.response_code, "OK");
}

#[tokio::test]
async fn test_stderr_section_follows_stdout() {
    let capture = CaptureMode {
        include_stderr: true,
        ..quiet()
    };
    let (sampler, _) = build(
        FakeTransport::new(ExecScript::new("fine\n", "oops", 0)),
        CommandRequest::new("cmd").with_capture(capture),
    );

    let data = sampler.sample().await.response_data_as_string();

    assert_eq!(data, "=== stdout ===\n\nfine\n\n\n=== stderr ===\n\noops\n");
    let stdout_at = data.find("fine").unwrap();
    let stderr_at = data.find("oops").unwrap();
    assert!(stdout_at < stderr_at);
}

#[tokio::test]
async fn test_stderr_excluded() {
    let (sampler, _) = build(
        FakeTransport::new(ExecScript::new("fine\n", "oops", 0)),
        CommandRequest::new("cmd").with_capture(quiet()),
    );

    let data = sampler.sample().await.response_data_as_string();

    assert_eq!(data, "fine\n");
    assert!(!data.contains("oops"));
}

#[tokio::test]
async fn test_pty_only_when_requested() {
    let with_pty = CaptureMode {
        use_pty: true,
        ..quiet()
    };
    let (sampler_pty, counters_pty) = build(
        FakeTransport::new(ExecScript::new("", "", 0)),
        CommandRequest::new("top -b -n1").with_capture(with_pty),
    );
    sampler_pty.sample().await;
    assert_eq!(Counters::get(&counters_pty.pty_requests), 1);

    let (sampler_plain, counters_plain) = build(
        FakeTransport::new(ExecScript::new("", "", 0)),
        CommandRequest::new("top -b -n1").with_capture(quiet()),
    );
    sampler_plain.sample().await;
    assert_eq!(Counters::get(&counters_plain.pty_requests), 0);
}

#[tokio::test]
async fn test_waits_for_channel_close() {
    let mut script = ExecScript::new("done\n", "", 0);
    script.open_polls = 5;
    let (sampler, _) = build(
        FakeTransport::new(script),
        CommandRequest::new("sleep 1").with_capture(quiet()),
    );

    let result = sampler.sample().await;

    assert!(result.successful);
    assert_eq!(result.response_code, "0");
}

#[tokio::test]
async fn test_missing_exit_status_reports_minus_one() {
    let mut script = ExecScript::new("", "", 0);
    script.exit_status = None;
    let (sampler, _) = build(
        FakeTransport::new(script),
        CommandRequest::new("kill -9 $$").with_capture(quiet()),
    );

    let result = sampler.sample().await;

    assert!(!result.successful);
    assert_eq!(result.response_code, "-1");
}

#[tokio::test]
async fn test_auth_rejected_short_circuits() {
    let (sampler, counters) = build(
        FakeTransport::rejecting("server rejected password"),
        CommandRequest::new("uptime"),
    );

    let result = sampler.sample().await;

    assert!(!result.successful);
    assert_eq!(result.response_code, "Connection Failed");
    assert_eq!(
        result.response_message,
        "Failed to connect to server: Auth fail: server rejected password"
    );
    assert!(result.response_data.is_empty());
    assert_eq!(Counters::get(&counters.connect_attempts), 1);
    assert_eq!(counters.channels_opened(), 0);
    assert_eq!(Counters::get(&counters.sessions_closed), 0);
}

#[tokio::test]
async fn test_stream_failure_keeps_partial_output() {
    let mut script = ExecScript::new("first\n", "", 0);
    script.stdout_breaks = true;
    let (sampler, counters) = build(
        FakeTransport::new(script),
        CommandRequest::new("cat big.log").with_capture(quiet()),
    );

    let result = sampler.sample().await;

    assert!(!result.successful);
    assert_eq!(result.response_code, "IOError");
    assert_eq!(result.response_message, "connection reset by peer");
    assert_eq!(result.response_data_as_string(), "first\n");
    assert_eq!(Counters::get(&counters.exec_closed), 1);
    assert_eq!(Counters::get(&counters.sessions_closed), 1);
}

#[tokio::test]
async fn test_exec_refused_is_channel_error() {
    let mut script = ExecScript::new("", "", 0);
    script.refuse_exec = true;
    let (sampler, counters) = build(
        FakeTransport::new(script),
        CommandRequest::new("uptime").with_capture(quiet()),
    );

    let result = sampler.sample().await;

    assert!(!result.successful);
    assert_eq!(result.response_code, "ExecChannelError");
    assert_eq!(result.response_message, "Server refused exec request");
    assert_eq!(Counters::get(&counters.exec_closed), 1);
}

#[tokio::test]
async fn test_stderr_flood_does_not_stall_stdout() {
    let stderr = "e".repeat(64 * 1024);
    let mut script = ExecScript::new("done\n", &stderr, 0);
    script.pipe_capacity = Some(1024);
    let (sampler, _) = build(
        FakeTransport::new(script),
        CommandRequest::new("noisy").with_capture(CaptureMode {
            include_stderr: true,
            ..quiet()
        }),
    );

    let result = tokio::time::timeout(Duration::from_secs(5), sampler.sample())
        .await
        .expect("sample stalled on a full stderr pipe");

    assert!(result.successful);
    assert_eq!(
        result.response_data_as_string(),
        format!("=== stdout ===\n\ndone\n\n\n=== stderr ===\n\n{stderr}\n")
    );
}

#[tokio::test]
async fn test_label_and_sampler_data() {
    let (sampler, _) = build(
        FakeTransport::new(ExecScript::new("", "", 0)),
        CommandRequest::new("df -h"),
    );

    let result = sampler.sample().await;
    assert_eq!(result.label, "SSH Command Sampler:(bench@sut.example:22)");
    assert_eq!(result.sampler_data, "df -h");

    let (named, _) = build(
        FakeTransport::new(ExecScript::new("", "", 0)),
        CommandRequest::new("df -h"),
    );
    let result = named.with_name("disk check").sample().await;
    assert_eq!(result.label, "disk check:(bench@sut.example:22)");
}
