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

//! Line-oriented draining of remote byte streams.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Reads `reader` to EOF, appending each line to `sink` followed by `\n`.
///
/// Line terminators (`\n` or `\r\n`) are stripped before the line is decoded
/// with lossy UTF-8 replacement, so a PTY's carriage returns never reach the
/// payload. Lines read before an I/O error stay in `sink`.
pub async fn drain_lines<R>(reader: R, sink: &mut String) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::with_capacity(256);

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        sink.push_str(&String::from_utf8_lossy(&line));
        sink.push('\n');
    }
}
