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

use crate::fs::{FileStatus, Path};
use crate::FsResult;

/// A positional read handle over a file whose length is fixed when it is
/// opened.
///
/// `read` may return fewer bytes than requested without having reached the
/// end of the file; `Ok(0)` is the only end-of-file signal. Callers loop.
pub trait Reader: Send {
    fn path(&self) -> &Path;

    fn len(&self) -> i64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pos(&self) -> i64;

    /// Bytes that can be served without blocking on the store.
    fn available(&self) -> i64 {
        (self.len() - self.pos()).max(0)
    }

    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize>;

    /// Move the read position. Seeking past the end of the file is an error.
    fn seek(&mut self, pos: i64) -> FsResult<()>;

    /// Read at `offset` without moving the read position. An offset outside
    /// `[0, len]` is an error, as for `seek`; `len` itself reads `Ok(0)`.
    fn read_at(&mut self, offset: i64, buf: &mut [u8]) -> FsResult<usize> {
        let old = self.pos();
        self.seek(offset)?;
        let res = self.read(buf);
        self.seek(old)?;
        res
    }

    fn complete(&mut self) -> FsResult<()>;
}

pub trait Writer: Send {
    fn path(&self) -> &Path;

    fn pos(&self) -> i64;

    /// Write the whole of `buf`.
    fn write(&mut self, buf: &[u8]) -> FsResult<()>;

    fn flush(&mut self) -> FsResult<()>;

    /// Flush and close; the file is visible at `path` once this returns.
    fn complete(&mut self) -> FsResult<()>;

    /// Abandon the file. Implementations release local resources; what is
    /// left on the store is unspecified.
    fn cancel(&mut self) -> FsResult<()> {
        Ok(())
    }
}

/// The generic filesystem surface the host framework consumes.
pub trait FileSystem: Send + Sync {
    fn scheme(&self) -> &str;

    /// Whether output written to this filesystem should go through the staged
    /// commit protocol instead of the host framework's default committer.
    fn supports_staged_commit(&self) -> bool {
        false
    }

    /// Resolve `path` against the working directory and attach this
    /// filesystem's scheme and authority.
    fn qualify(&self, path: &Path) -> FsResult<Path>;

    fn mkdirs(&self, path: &Path) -> FsResult<bool>;

    fn create(&self, path: &Path, overwrite: bool) -> FsResult<Box<dyn Writer>>;

    fn append(&self, path: &Path) -> FsResult<Box<dyn Writer>>;

    fn open(&self, path: &Path) -> FsResult<Box<dyn Reader>>;

    fn exists(&self, path: &Path) -> FsResult<bool>;

    fn is_file(&self, path: &Path) -> FsResult<bool>;

    fn is_dir(&self, path: &Path) -> FsResult<bool>;

    fn get_status(&self, path: &Path) -> FsResult<FileStatus>;

    /// Children of a directory, or the file itself when `path` is a file.
    fn list_status(&self, path: &Path) -> FsResult<Vec<FileStatus>>;

    /// Returns false when `path` did not exist.
    fn delete(&self, path: &Path, recursive: bool) -> FsResult<bool>;

    fn rename(&self, src: &Path, dst: &Path) -> FsResult<bool>;
}

impl<R: Reader + ?Sized> Reader for Box<R> {
    fn path(&self) -> &Path {
        (**self).path()
    }

    fn len(&self) -> i64 {
        (**self).len()
    }

    fn pos(&self) -> i64 {
        (**self).pos()
    }

    fn available(&self) -> i64 {
        (**self).available()
    }

    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        (**self).read(buf)
    }

    fn seek(&mut self, pos: i64) -> FsResult<()> {
        (**self).seek(pos)
    }

    fn read_at(&mut self, offset: i64, buf: &mut [u8]) -> FsResult<usize> {
        (**self).read_at(offset, buf)
    }

    fn complete(&mut self) -> FsResult<()> {
        (**self).complete()
    }
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn path(&self) -> &Path {
        (**self).path()
    }

    fn pos(&self) -> i64 {
        (**self).pos()
    }

    fn write(&mut self, buf: &[u8]) -> FsResult<()> {
        (**self).write(buf)
    }

    fn flush(&mut self) -> FsResult<()> {
        (**self).flush()
    }

    fn complete(&mut self) -> FsResult<()> {
        (**self).complete()
    }

    fn cancel(&mut self) -> FsResult<()> {
        (**self).cancel()
    }
}
