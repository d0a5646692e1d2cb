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

use crate::irods::{FsStatistics, RemoteOutput};
use hirods_common::error::FsError;
use hirods_common::fs::{Path, Writer};
use hirods_common::FsResult;
use log::warn;
use std::sync::Arc;

/// Writer on a remote output handle, coalescing small writes into calls of
/// `buffer_size` bytes.
pub struct IrodsWriter {
    out: Box<dyn RemoteOutput>,
    path: Path,
    buf: Vec<u8>,
    capacity: usize,
    pos: i64,
    stats: Arc<FsStatistics>,
    closed: bool,
}

impl IrodsWriter {
    pub fn new(
        path: Path,
        out: Box<dyn RemoteOutput>,
        buffer_size: usize,
        stats: Arc<FsStatistics>,
    ) -> Self {
        let capacity = buffer_size.max(1);
        Self {
            out,
            path,
            buf: Vec::with_capacity(capacity),
            capacity,
            pos: 0,
            stats,
            closed: false,
        }
    }

    fn flush_buf(&mut self) -> FsResult<()> {
        if !self.buf.is_empty() {
            self.out.write(&self.buf)?;
            self.stats.incr_bytes_written(self.buf.len() as i64);
            self.buf.clear();
        }
        Ok(())
    }
}

impl Writer for IrodsWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn pos(&self) -> i64 {
        self.pos
    }

    fn write(&mut self, data: &[u8]) -> FsResult<()> {
        if self.closed {
            return Err(FsError::stream_closed(self.path.full_path()));
        }

        if self.buf.len() + data.len() > self.capacity {
            self.flush_buf()?;
        }
        if data.len() >= self.capacity {
            self.out.write(data)?;
            self.stats.incr_bytes_written(data.len() as i64);
        } else {
            self.buf.extend_from_slice(data);
        }

        self.pos += data.len() as i64;
        Ok(())
    }

    fn flush(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.flush_buf()?;
        self.out.flush()
    }

    fn complete(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }
        let res = self.flush_buf();
        self.closed = true;
        let close = self.out.close();
        res.and(close)
    }

    fn cancel(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.buf.clear();
        self.out.close()
    }
}

impl Drop for IrodsWriter {
    fn drop(&mut self) {
        if !self.closed {
            warn!("{} dropped without complete, flushing", self.path);
            if let Err(e) = self.complete() {
                warn!("failed to close {}: {}", self.path, e);
            }
        }
    }
}
