// Copyright 2025 OPPO.
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

use crate::irods::IrodsAccount;
use hirods_common::FsResult;

/// Metadata of one entry on the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteStat {
    pub is_dir: bool,
    pub len: i64,
    pub mtime: i64,
}

/// A positional read handle on a remote file.
pub trait RandomAccessFile: Send {
    fn length(&self) -> FsResult<i64>;

    fn seek(&mut self, pos: i64) -> FsResult<()>;

    /// Read from the current position. Returns 0 at end of file and may
    /// return fewer bytes than requested.
    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize>;

    fn read_at(&mut self, offset: i64, buf: &mut [u8]) -> FsResult<usize> {
        self.seek(offset)?;
        self.read(buf)
    }

    fn close(&mut self) -> FsResult<()>;
}

/// A sequential, truncating write handle on a remote file.
pub trait RemoteOutput: Send {
    fn write(&mut self, buf: &[u8]) -> FsResult<()>;

    fn flush(&mut self) -> FsResult<()>;

    fn close(&mut self) -> FsResult<()>;
}

/// An open, authenticated connection to the remote store.
///
/// A session is created once and handed to every component that talks to the
/// store; closing it is the owner's job. Paths are absolute paths inside the
/// store (`/<zone>/home/<user>/...`).
pub trait RemoteSession: Send + Sync {
    fn account(&self) -> &IrodsAccount;

    /// `None` when nothing exists at `path`.
    fn stat(&self, path: &str) -> FsResult<Option<RemoteStat>>;

    /// Names of the entries of a directory.
    fn list(&self, path: &str) -> FsResult<Vec<String>>;

    fn mkdirs(&self, path: &str) -> FsResult<bool>;

    /// Remove a file or an empty directory.
    fn delete(&self, path: &str) -> FsResult<bool>;

    fn rename(&self, src: &str, dst: &str) -> FsResult<bool>;

    fn open_random_access(&self, path: &str) -> FsResult<Box<dyn RandomAccessFile>>;

    /// Create or truncate `path`. The parent must exist.
    fn open_output(&self, path: &str) -> FsResult<Box<dyn RemoteOutput>>;

    fn close(&self) -> FsResult<()>;
}
