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

//! SFTP channel on top of russh-sftp's raw protocol session.
//!
//! Some sshd_config does not enable sftp by default. A config line like
//! `Subsystem sftp internal-sftp` or `Subsystem sftp /usr/lib/openssh/sftp-server`
//! is needed on the remote machine.

use async_trait::async_trait;
use chrono::DateTime;
use russh_sftp::client::error::Error as SftpError;
use russh_sftp::client::RawSftpSession;
use russh_sftp::protocol::{File, FileAttributes, OpenFlags, StatusCode};
use std::io::Cursor;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ssh::error::Error;
use crate::ssh::transport::{BoxedReader, RemoteEntry, SftpChannel};

/// Bytes requested per READ and sent per WRITE packet.
const CHUNK_SIZE: u32 = 32 * 1024;

const S_IFMT: u32 = 0o170000;
const S_IFSOCK: u32 = 0o140000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFDIR: u32 = 0o040000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;

/// A channel running the sftp subsystem.
pub struct RusshSftpChannel {
    sftp: Option<RawSftpSession>,
}

impl RusshSftpChannel {
    /// Starts the sftp protocol on `stream`, normally a session channel that
    /// has the `sftp` subsystem running.
    pub async fn open<S>(stream: S) -> Result<Self, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let sftp = RawSftpSession::new(stream);
        let version = sftp.init().await?;
        tracing::trace!("SFTP protocol version {}", version.version);
        Ok(Self { sftp: Some(sftp) })
    }

    fn session(&self) -> Result<&RawSftpSession, Error> {
        self.sftp.as_ref().ok_or(Error::SessionClosed)
    }
}

#[async_trait]
impl SftpChannel for RusshSftpChannel {
    async fn open_read(&mut self, path: &str) -> Result<BoxedReader, Error> {
        // The printed content ends up in the sample payload in full anyway
        let mut content = Vec::new();
        read_remote(self.session()?, path, &mut content).await?;
        Ok(Box::new(Cursor::new(content)))
    }

    async fn download(&mut self, remote: &str, local: &Path) -> Result<(), Error> {
        let sftp = self.session()?;
        let mut local_file = tokio::fs::File::create(local).await?;
        let copied = read_remote(sftp, remote, &mut local_file).await?;
        tracing::debug!("Downloaded {} bytes from {} to {:?}", copied, remote, local);
        Ok(())
    }

    async fn upload(&mut self, local: &Path, remote: &str) -> Result<(), Error> {
        let sftp = self.session()?;
        let mut local_file = tokio::fs::File::open(local).await?;
        let handle = sftp
            .open(
                remote,
                OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE,
                FileAttributes::empty(),
            )
            .await?
            .handle;

        let copied = write_remote(sftp, &handle, &mut local_file).await;
        let closed = sftp.close(handle).await;
        let copied = copied?;
        closed?;
        tracing::debug!("Uploaded {} bytes from {:?} to {}", copied, local, remote);
        Ok(())
    }

    async fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, Error> {
        let sftp = self.session()?;
        let handle = sftp.opendir(path).await?.handle;

        let listing = read_entries(sftp, &handle).await;
        let closed = sftp.close(handle).await;
        let listing = listing?;
        closed?;
        Ok(listing)
    }

    async fn remove_file(&mut self, path: &str) -> Result<(), Error> {
        self.session()?.remove(path).await?;
        Ok(())
    }

    async fn remove_dir(&mut self, path: &str) -> Result<(), Error> {
        self.session()?.rmdir(path).await?;
        Ok(())
    }

    async fn create_dir(&mut self, path: &str) -> Result<(), Error> {
        self.session()?.mkdir(path, FileAttributes::empty()).await?;
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), Error> {
        self.session()?.rename(from, to).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        if let Some(sftp) = self.sftp.take() {
            sftp.close_session()?;
        }
        Ok(())
    }
}

/// `Ok(None)` once the server reports end of file or end of directory.
fn until_eof<T>(result: Result<T, SftpError>) -> Result<Option<T>, Error> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(SftpError::Status(status)) if status.status_code == StatusCode::Eof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Copy a remote file into `sink`, closing the remote handle in every case.
async fn read_remote<W>(sftp: &RawSftpSession, path: &str, sink: &mut W) -> Result<u64, Error>
where
    W: AsyncWrite + Unpin,
{
    let handle = sftp
        .open(path, OpenFlags::READ, FileAttributes::empty())
        .await?
        .handle;

    let copied = copy_from_remote(sftp, &handle, sink).await;
    let closed = sftp.close(handle).await;
    let copied = copied?;
    closed?;
    Ok(copied)
}

async fn copy_from_remote<W>(
    sftp: &RawSftpSession,
    handle: &str,
    sink: &mut W,
) -> Result<u64, Error>
where
    W: AsyncWrite + Unpin,
{
    let mut offset = 0u64;
    while let Some(chunk) = until_eof(sftp.read(handle, offset, CHUNK_SIZE).await)? {
        if chunk.data.is_empty() {
            break;
        }
        sink.write_all(&chunk.data).await?;
        offset += chunk.data.len() as u64;
    }
    sink.flush().await?;
    Ok(offset)
}

async fn write_remote<R>(
    sftp: &RawSftpSession,
    handle: &str,
    source: &mut R,
) -> Result<u64, Error>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; CHUNK_SIZE as usize];
    let mut offset = 0u64;
    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            return Ok(offset);
        }
        sftp.write(handle, offset, buf[..n].to_vec()).await?;
        offset += n as u64;
    }
}

/// Read every READDIR batch, keeping entries in the order the server sent them.
async fn read_entries(sftp: &RawSftpSession, handle: &str) -> Result<Vec<RemoteEntry>, Error> {
    let mut listing = Vec::new();
    while let Some(batch) = until_eof(sftp.readdir(handle).await)? {
        listing.extend(batch.files.into_iter().map(|file| RemoteEntry {
            long_name: long_name_of(&file),
            name: file.filename,
        }));
    }
    Ok(listing)
}

/// The server's long name, or one rendered from the attributes when the server sent none.
fn long_name_of(file: &File) -> String {
    if !file.longname.is_empty() {
        return file.longname.clone();
    }
    let attrs = &file.attrs;
    format_long_name(
        &file.filename,
        attrs.permissions,
        attrs.uid,
        attrs.gid,
        attrs.size,
        attrs.mtime,
    )
}

/// Render an entry the way `ls -l` does.
pub fn format_long_name(
    name: &str,
    permissions: Option<u32>,
    uid: Option<u32>,
    gid: Option<u32>,
    size: Option<u64>,
    mtime: Option<u32>,
) -> String {
    let mode = permissions.unwrap_or(0);
    let file_type = match mode & S_IFMT {
        S_IFDIR => 'd',
        S_IFLNK => 'l',
        S_IFCHR => 'c',
        S_IFBLK => 'b',
        S_IFIFO => 'p',
        S_IFSOCK => 's',
        S_IFREG => '-',
        _ => '-',
    };

    let bits = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    let perm_str: String = bits
        .iter()
        .map(|&(bit, c)| if mode & bit != 0 { c } else { '-' })
        .collect();

    let modified = mtime
        .and_then(|t| DateTime::from_timestamp(i64::from(t), 0))
        .map(|t| t.format("%b %e %H:%M").to_string())
        .unwrap_or_else(|| "Jan  1 00:00".to_string());

    format!(
        "{file_type}{perm_str} {:>4} {:<8} {:<8} {:>8} {modified} {name}",
        1,
        uid.unwrap_or(0),
        gid.unwrap_or(0),
        size.unwrap_or(0),
    )
}
