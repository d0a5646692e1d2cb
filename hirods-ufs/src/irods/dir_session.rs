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

use crate::irods::{IrodsAccount, RandomAccessFile, RemoteOutput, RemoteSession, RemoteStat};
use hirods_common::error::FsError;
use hirods_common::{err_ufs, FsResult};
use log::{debug, info};
use std::fs;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::UNIX_EPOCH;

/// A session whose store is a directory on the local disk. Store paths map to
/// `<root>/<path>`.
pub struct DirSession {
    root: PathBuf,
    account: IrodsAccount,
    closed: AtomicBool,
}

impl DirSession {
    pub fn new(root: impl Into<PathBuf>, account: IrodsAccount) -> FsResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let home = root.join(account.home_directory.trim_start_matches('/'));
        fs::create_dir_all(home)?;

        info!(
            "opened directory session at {} for {}@{}",
            root.display(),
            account.username,
            account.zone
        );
        Ok(Self {
            root,
            account,
            closed: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn local(&self, path: &str) -> FsResult<PathBuf> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(FsError::stream_closed("session is closed"));
        }
        if path.split('/').any(|x| x == "..") {
            return Err(FsError::invalid_path(path, "Parent references are not allowed"));
        }
        Ok(self.root.join(path.trim_start_matches('/')))
    }
}

impl RemoteSession for DirSession {
    fn account(&self) -> &IrodsAccount {
        &self.account
    }

    fn stat(&self, path: &str) -> FsResult<Option<RemoteStat>> {
        let meta = match fs::metadata(self.local(path)?) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mtime = meta
            .modified()
            .ok()
            .and_then(|x| x.duration_since(UNIX_EPOCH).ok())
            .map(|x| x.as_millis() as i64)
            .unwrap_or(0);

        Ok(Some(RemoteStat {
            is_dir: meta.is_dir(),
            len: if meta.is_dir() { 0 } else { meta.len() as i64 },
            mtime,
        }))
    }

    fn list(&self, path: &str) -> FsResult<Vec<String>> {
        let mut names = vec![];
        for entry in fs::read_dir(self.local(path)?)? {
            names.push(entry?.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    fn mkdirs(&self, path: &str) -> FsResult<bool> {
        fs::create_dir_all(self.local(path)?)?;
        Ok(true)
    }

    fn delete(&self, path: &str) -> FsResult<bool> {
        let local = self.local(path)?;
        let res = if local.is_dir() {
            fs::remove_dir(&local)
        } else {
            fs::remove_file(&local)
        };

        match res {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => err_ufs!("Failed to delete {}: {}", path, e),
        }
    }

    fn rename(&self, src: &str, dst: &str) -> FsResult<bool> {
        let (src, dst) = (self.local(src)?, self.local(dst)?);
        if !src.exists() || dst.exists() {
            return Ok(false);
        }
        fs::rename(src, dst)?;
        Ok(true)
    }

    fn open_random_access(&self, path: &str) -> FsResult<Box<dyn RandomAccessFile>> {
        let local = self.local(path)?;
        let file = match File::open(&local) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FsError::file_not_found(path))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Box::new(DirRandomAccess { file: Some(file) }))
    }

    fn open_output(&self, path: &str) -> FsResult<Box<dyn RemoteOutput>> {
        let file = File::create(self.local(path)?)?;
        debug!("open output {}", path);
        Ok(Box::new(DirOutput { file: Some(file) }))
    }

    fn close(&self) -> FsResult<()> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

struct DirRandomAccess {
    file: Option<File>,
}

impl DirRandomAccess {
    fn file(&mut self) -> FsResult<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| FsError::stream_closed("random access file"))
    }
}

impl RandomAccessFile for DirRandomAccess {
    fn length(&self) -> FsResult<i64> {
        match &self.file {
            Some(f) => Ok(f.metadata()?.len() as i64),
            None => Err(FsError::stream_closed("random access file")),
        }
    }

    fn seek(&mut self, pos: i64) -> FsResult<()> {
        if pos < 0 {
            return err_ufs!("Negative seek position {}", pos);
        }
        self.file()?.seek(SeekFrom::Start(pos as u64))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        Ok(self.file()?.read(buf)?)
    }

    fn close(&mut self) -> FsResult<()> {
        self.file.take();
        Ok(())
    }
}

struct DirOutput {
    file: Option<File>,
}

impl RemoteOutput for DirOutput {
    fn write(&mut self, buf: &[u8]) -> FsResult<()> {
        match self.file.as_mut() {
            Some(f) => Ok(f.write_all(buf)?),
            None => Err(FsError::stream_closed("remote output")),
        }
    }

    fn flush(&mut self) -> FsResult<()> {
        match self.file.as_mut() {
            Some(f) => Ok(f.flush()?),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> FsResult<()> {
        match self.file.take() {
            Some(mut f) => {
                f.flush()?;
                Ok(f.sync_all()?)
            }
            None => Ok(()),
        }
    }
}
