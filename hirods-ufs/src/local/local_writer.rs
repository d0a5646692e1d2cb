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

use hirods_common::error::FsError;
use hirods_common::fs::{Path, Writer};
use hirods_common::FsResult;
use std::fs::File;
use std::io::{BufWriter, Write};

pub struct LocalWriter {
    out: Option<BufWriter<File>>,
    path: Path,
    pos: i64,
}

impl LocalWriter {
    pub fn new(path: Path, file: File, buffer_size: usize) -> Self {
        Self {
            out: Some(BufWriter::with_capacity(buffer_size.max(1), file)),
            path,
            pos: 0,
        }
    }

    pub fn with_pos(mut self, pos: i64) -> Self {
        self.pos = pos;
        self
    }

    fn out(&mut self) -> FsResult<&mut BufWriter<File>> {
        match self.out.as_mut() {
            Some(f) => Ok(f),
            None => Err(FsError::stream_closed(self.path.full_path())),
        }
    }
}

impl Writer for LocalWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn pos(&self) -> i64 {
        self.pos
    }

    fn write(&mut self, buf: &[u8]) -> FsResult<()> {
        self.out()?.write_all(buf)?;
        self.pos += buf.len() as i64;
        Ok(())
    }

    fn flush(&mut self) -> FsResult<()> {
        self.out()?.flush()?;
        Ok(())
    }

    fn complete(&mut self) -> FsResult<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        Ok(())
    }

    fn cancel(&mut self) -> FsResult<()> {
        // Drop buffered bytes without writing them.
        if let Some(out) = self.out.take() {
            let _ = out.into_parts();
        }
        Ok(())
    }
}
