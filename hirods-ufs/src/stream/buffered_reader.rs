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

use hirods_common::conf::SeekPolicy;
use hirods_common::error::FsError;
use hirods_common::fs::{Path, Reader};
use hirods_common::{err_box, FsResult};
use std::io;
use std::io::{BufRead, SeekFrom};

/// A single read-ahead window over a positional reader.
///
/// The window holds one contiguous run of bytes fetched by a single call on
/// the inner reader. It is never topped up: a refill drops the previous
/// content and fetches `[start_pos + valid_len, +capacity)` in one call, so
/// refills always continue where the delivered data ended.
///
/// `read` copies at most what one window holds and may return fewer bytes
/// than asked for; `Ok(0)` means end of file. Callers loop.
///
/// Invariant: `cursor <= valid_len <= capacity`, and the logical position is
/// `start_pos + cursor`.
pub struct BufferedReader<R> {
    inner: R,
    path: Path,
    len: i64,
    policy: SeekPolicy,
    capacity: usize,

    buf: Vec<u8>,
    start_pos: i64,
    valid_len: usize,
    cursor: usize,

    closed: bool,
}

impl<R: Reader> BufferedReader<R> {
    pub fn new(inner: R, capacity: usize) -> Self {
        Self::with_policy(inner, capacity, SeekPolicy::Window)
    }

    pub fn with_policy(inner: R, capacity: usize, policy: SeekPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            path: inner.path().clone(),
            len: inner.len(),
            start_pos: inner.pos(),
            inner,
            policy,
            capacity,
            buf: vec![0; capacity],
            valid_len: 0,
            cursor: 0,
            closed: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> SeekPolicy {
        self.policy
    }

    /// Unread bytes resident in the window.
    pub fn buffered(&self) -> usize {
        self.valid_len - self.cursor
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    fn check_open(&self) -> FsResult<()> {
        if self.closed {
            Err(FsError::stream_closed(self.path.full_path()))
        } else {
            Ok(())
        }
    }

    // Replace the window with the bytes that follow it. At or past the end of
    // the file nothing is fetched.
    fn fill(&mut self) -> FsResult<usize> {
        let start = self.start_pos + self.valid_len as i64;
        self.start_pos = start;
        self.valid_len = 0;
        self.cursor = 0;

        if start >= self.len {
            return Ok(0);
        }

        if self.inner.pos() != start {
            self.inner.seek(start)?;
        }
        let n = self.inner.read(&mut self.buf)?;
        self.valid_len = n;
        Ok(n)
    }

    /// Next byte, or `None` at end of file.
    pub fn read_byte(&mut self) -> FsResult<Option<u8>> {
        self.check_open()?;
        if self.cursor == self.valid_len && self.fill()? == 0 {
            return Ok(None);
        }

        let b = self.buf[self.cursor];
        self.cursor += 1;
        Ok(Some(b))
    }

    /// Skip up to `n` bytes, never past the end of the file. Returns the
    /// number of bytes actually skipped.
    pub fn skip(&mut self, n: i64) -> FsResult<i64> {
        self.check_open()?;
        if n <= 0 {
            return Ok(0);
        }

        if n <= self.buffered() as i64 {
            self.cursor += n as usize;
            return Ok(n);
        }

        let pos = Reader::pos(self);
        let skipped = n.min(self.len - pos).max(0);
        Reader::seek(self, pos + skipped)?;
        Ok(skipped)
    }

    pub fn mark_supported(&self) -> bool {
        false
    }

    pub fn mark(&mut self, _read_limit: usize) {}

    pub fn reset(&mut self) -> FsResult<()> {
        Err(FsError::unsupported("mark/reset is not supported"))
    }
}

impl<R: Reader> Reader for BufferedReader<R> {
    fn path(&self) -> &Path {
        &self.path
    }

    fn len(&self) -> i64 {
        self.len
    }

    fn pos(&self) -> i64 {
        self.start_pos + self.cursor as i64
    }

    fn available(&self) -> i64 {
        if self.closed {
            return 0;
        }
        self.buffered() as i64 + self.inner.available()
    }

    fn read(&mut self, dst: &mut [u8]) -> FsResult<usize> {
        self.check_open()?;
        if dst.is_empty() {
            return Ok(0);
        }

        if self.cursor == self.valid_len && self.fill()? == 0 {
            return Ok(0);
        }

        let n = dst.len().min(self.valid_len - self.cursor);
        dst[..n].copy_from_slice(&self.buf[self.cursor..self.cursor + n]);
        self.cursor += n;
        Ok(n)
    }

    fn seek(&mut self, pos: i64) -> FsResult<()> {
        self.check_open()?;
        if pos < 0 || pos > self.len {
            return err_box!(
                "Seek position {} out of range [0, {}] for {}",
                pos,
                self.len,
                self.path
            );
        }

        let in_window = pos >= self.start_pos && pos < self.start_pos + self.valid_len as i64;
        match self.policy {
            SeekPolicy::Window if in_window => {
                self.cursor = (pos - self.start_pos) as usize;
            }

            _ => {
                self.inner.seek(pos)?;
                self.start_pos = pos;
                self.valid_len = 0;
                self.cursor = 0;
            }
        }

        Ok(())
    }

    /// Release the window and close the inner reader. Later reads, seeks and
    /// skips fail; closing twice is a no-op.
    fn complete(&mut self) -> FsResult<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.buf = Vec::new();
        self.start_pos += self.cursor as i64;
        self.valid_len = 0;
        self.cursor = 0;
        self.inner.complete()
    }
}

impl<R: Reader> io::Read for BufferedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(Reader::read(self, buf)?)
    }
}

impl<R: Reader> BufRead for BufferedReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.check_open()?;
        if self.cursor == self.valid_len {
            self.fill()?;
        }
        Ok(&self.buf[self.cursor..self.valid_len])
    }

    fn consume(&mut self, amt: usize) {
        self.cursor = (self.cursor + amt).min(self.valid_len);
    }
}

impl<R: Reader> io::Seek for BufferedReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::End(n) => self.len + n,
            SeekFrom::Current(n) => Reader::pos(self) + n,
        };
        if target < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Seek to negative position {}", target),
            ));
        }

        Reader::seek(self, target)?;
        Ok(target as u64)
    }
}
