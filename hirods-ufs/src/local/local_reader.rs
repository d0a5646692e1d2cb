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
use hirods_common::fs::{Path, Reader};
use hirods_common::{err_box, FsResult};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

pub struct LocalReader {
    file: Option<File>,
    path: Path,
    len: i64,
    pos: i64,
}

impl LocalReader {
    pub fn new(path: Path, file: File) -> FsResult<Self> {
        let len = file.metadata()?.len() as i64;
        Ok(Self {
            file: Some(file),
            path,
            len,
            pos: 0,
        })
    }

    fn file(&mut self) -> FsResult<&mut File> {
        match self.file.as_mut() {
            Some(f) => Ok(f),
            None => Err(FsError::stream_closed(self.path.full_path())),
        }
    }
}

impl Reader for LocalReader {
    fn path(&self) -> &Path {
        &self.path
    }

    fn len(&self) -> i64 {
        self.len
    }

    fn pos(&self) -> i64 {
        self.pos
    }

    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        let n = self.file()?.read(buf)?;
        self.pos += n as i64;
        Ok(n)
    }

    fn seek(&mut self, pos: i64) -> FsResult<()> {
        if pos < 0 || pos > self.len {
            return err_box!("Seek position {} out of range [0, {}]", pos, self.len);
        }
        self.file()?.seek(SeekFrom::Start(pos as u64))?;
        self.pos = pos;
        Ok(())
    }

    fn complete(&mut self) -> FsResult<()> {
        self.file.take();
        Ok(())
    }
}
