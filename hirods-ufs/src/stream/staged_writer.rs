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

use crate::irods::{FsStatistics, IrodsWriter, RemoteSession};
use hirods_common::error::FsError;
use hirods_common::fs::{FileSystem, Path, Reader, Writer};
use hirods_common::FsResult;
use log::{debug, warn};
use std::sync::Arc;

/// Writes land in a local staging file; `complete` streams the staged file
/// into the remote store in one pass.
///
/// The staging file is deleted on `complete` whether or not the upload
/// succeeded, on `cancel`, and when the writer is dropped unfinished. A failed
/// upload may leave a partial remote file behind.
pub struct StagedWriter {
    path: Path,
    remote: String,
    session: Arc<dyn RemoteSession>,
    stats: Arc<FsStatistics>,
    buffer_size: usize,

    staging_fs: Arc<dyn FileSystem>,
    staging_path: Path,
    staging_dir: Option<Path>,
    staging: Option<Box<dyn Writer>>,
    pos: i64,
}

impl StagedWriter {
    /// `path` is the qualified remote path, `remote` its location inside the
    /// store. The staging file's parent directory is created when missing and
    /// is then removed together with the staging file.
    pub fn new(
        path: Path,
        remote: impl Into<String>,
        session: Arc<dyn RemoteSession>,
        staging_fs: Arc<dyn FileSystem>,
        staging_path: Path,
        buffer_size: usize,
        stats: Arc<FsStatistics>,
    ) -> FsResult<Self> {
        let mut staging_dir = None;
        if let Some(parent) = staging_path.parent() {
            if !parent.is_root() && !staging_fs.exists(&parent)? {
                staging_fs.mkdirs(&parent)?;
                staging_dir = Some(parent);
            }
        }

        let staging = staging_fs.create(&staging_path, true)?;
        debug!("staging {} at {}", path, staging_path);

        Ok(Self {
            path,
            remote: remote.into(),
            session,
            stats,
            buffer_size: buffer_size.max(1),
            staging_fs,
            staging_path,
            staging_dir,
            staging: Some(staging),
            pos: 0,
        })
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    fn staging(&mut self) -> FsResult<&mut Box<dyn Writer>> {
        match self.staging.as_mut() {
            Some(w) => Ok(w),
            None => Err(FsError::stream_closed(self.path.full_path())),
        }
    }

    fn delete_staging(&self) {
        match self.staging_fs.delete(&self.staging_path, false) {
            Ok(_) => (),
            Err(e) => warn!("failed to delete staging file {}: {}", self.staging_path, e),
        }

        if let Some(dir) = &self.staging_dir {
            if let Err(e) = self.staging_fs.delete(dir, false) {
                warn!("failed to delete staging dir {}: {}", dir, e);
            }
        }
    }

    // Copy the closed staging file into `remote`, which is set as soon as
    // the remote file has been created so the caller can close it.
    fn upload(&self, remote: &mut Option<IrodsWriter>) -> FsResult<i64> {
        let out = self.session.open_output(&self.remote)?;
        let writer = remote.insert(IrodsWriter::new(
            self.path.clone(),
            out,
            self.buffer_size,
            self.stats.clone(),
        ));

        let mut reader = self.staging_fs.open(&self.staging_path)?;
        let mut buf = vec![0u8; self.buffer_size];
        let mut total = 0;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            writer.write(&buf[..n])?;
            total += n as i64;
        }

        if let Err(e) = reader.complete() {
            warn!("failed to close staging file {}: {}", self.staging_path, e);
        }
        Ok(total)
    }
}

impl Writer for StagedWriter {
    fn path(&self) -> &Path {
        &self.path
    }

    fn pos(&self) -> i64 {
        self.pos
    }

    fn write(&mut self, buf: &[u8]) -> FsResult<()> {
        self.staging()?.write(buf)?;
        self.pos += buf.len() as i64;
        Ok(())
    }

    fn flush(&mut self) -> FsResult<()> {
        self.staging()?.flush()
    }

    fn complete(&mut self) -> FsResult<()> {
        let mut staging = match self.staging.take() {
            Some(v) => v,
            None => return Ok(()),
        };

        if let Err(e) = staging.complete() {
            self.delete_staging();
            return Err(e);
        }

        let mut remote = None;
        let res = self.upload(&mut remote);
        self.delete_staging();

        let close = match remote.as_mut() {
            Some(w) => w.complete(),
            None => Ok(()),
        };

        let len = res?;
        close?;
        debug!("uploaded {} bytes from {} to {}", len, self.staging_path, self.path);
        Ok(())
    }

    fn cancel(&mut self) -> FsResult<()> {
        if let Some(mut staging) = self.staging.take() {
            let res = staging.cancel();
            self.delete_staging();
            res?;
        }
        Ok(())
    }
}

impl Drop for StagedWriter {
    fn drop(&mut self) {
        if self.staging.is_some() {
            warn!("{} dropped before complete, discarding staged data", self.path);
            if let Err(e) = self.cancel() {
                warn!("failed to cancel {}: {}", self.path, e);
            }
        }
    }
}
