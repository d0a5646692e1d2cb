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

use crate::irods::{FsStatistics, RandomAccessFile};
use hirods_common::error::FsError;
use hirods_common::fs::{Path, Reader};
use hirods_common::{err_box, FsResult};
use log::warn;
use std::sync::Arc;

/// Unbuffered reader over a remote random access handle. Every `read` is one
/// call on the store.
pub struct IrodsReader {
    file: Box<dyn RandomAccessFile>,
    path: Path,
    length: i64,
    pos: i64,
    stats: Arc<FsStatistics>,
    closed: bool,
}

impl IrodsReader {
    pub fn new(
        path: Path,
        file: Box<dyn RandomAccessFile>,
        stats: Arc<FsStatistics>,
    ) -> FsResult<Self> {
        let length = file.length()?;
        Ok(Self {
            file,
            path,
            length,
            pos: 0,
            stats,
            closed: false,
        })
    }
}

impl Reader for IrodsReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn len(&self) -> i64 {
        self.length
    }

    fn pos(&self) -> i64 {
        self.pos
    }

    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        if self.closed {
            return Err(FsError::stream_closed(self.path.full_path()));
        }
        if buf.is_empty() || self.pos >= self.length {
            return Ok(0);
        }

        let want = buf.len().min((self.length - self.pos) as usize);
        let n = self.file.read(&mut buf[..want])?;
        self.pos += n as i64;
        self.stats.incr_bytes_read(n as i64);
        Ok(n)
    }

    fn seek(&mut self, pos: i64) -> FsResult<()> {
        if self.closed {
            return Err(FsError::stream_closed(self.path.full_path()));
        }
        if pos < 0 || pos > self.length {
            return err_box!(
                "Seek position {} out of range [0, {}] for {}",
                pos,
                self.length,
                self.path
            );
        }

        self.file.seek(pos)?;
        self.pos = pos;
        Ok(())
    }

    fn read_at(&mut self, offset: i64, buf: &mut [u8]) -> FsResult<usize> {
        if self.closed {
            return Err(FsError::stream_closed(self.path.full_path()));
        }
        if offset < 0 || offset > self.length {
            return err_box!(
                "Read position {} out of range [0, {}] for {}",
                offset,
                self.length,
                self.path
            );
        }
        if offset == self.length || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min((self.length - offset) as usize);
        let n = self.file.read_at(offset, &mut buf[..want])?;
        // The handle moved; put it back where sequential reads expect it.
        self.file.seek(self.pos)?;
        self.stats.incr_bytes_read(n as i64);
        Ok(n)
    }

    fn complete(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.file.close()
    }
}

impl Drop for IrodsReader {
    fn drop(&mut self) {
        if let Err(e) = self.complete() {
            warn!("failed to close {}: {}", self.path, e);
        }
    }
}
