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

use crate::local::{LocalReader, LocalWriter};
use hirods_common::error::FsError;
use hirods_common::fs::{FileStatus, FileSystem, Path, Reader, Writer};
use hirods_common::{FsResult, FILE_BUFFER_SIZE};
use std::fs;
use std::fs::{File, Metadata, OpenOptions};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::UNIX_EPOCH;

/// The local disk, used as the staging filesystem for staged writes and task
/// work areas.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    buffer_size: usize,
}

impl LocalFileSystem {
    pub const SCHEME: &'static str = "file";

    pub fn new() -> Self {
        Self::with_buffer_size(FILE_BUFFER_SIZE)
    }

    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self { buffer_size }
    }

    fn local(&self, path: &Path) -> FsResult<PathBuf> {
        match path.scheme() {
            None | Some(Self::SCHEME) => Ok(PathBuf::from(path.path())),
            Some(s) => Err(FsError::invalid_path(
                path.full_path(),
                format!("Wrong filesystem, expected {} but got {}", Self::SCHEME, s),
            )),
        }
    }

    fn metadata(&self, path: &Path) -> FsResult<Option<Metadata>> {
        match fs::metadata(self.local(path)?) {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn to_status(path: &Path, meta: &Metadata) -> FileStatus {
        let mtime = meta
            .modified()
            .ok()
            .and_then(|x| x.duration_since(UNIX_EPOCH).ok())
            .map(|x| x.as_millis() as i64)
            .unwrap_or(0);

        FileStatus {
            path: path.full_path(),
            name: path.name().to_string(),
            is_dir: meta.is_dir(),
            len: if meta.is_dir() { 0 } else { meta.len() as i64 },
            mtime,
            replicas: 1,
            block_size: FILE_BUFFER_SIZE as i64,
        }
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for LocalFileSystem {
    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    fn qualify(&self, path: &Path) -> FsResult<Path> {
        let local = self.local(path)?;
        let abs = if local.is_absolute() {
            local
        } else {
            std::env::current_dir()?.join(local)
        };
        Ok(Path::from_parts(
            Some(Self::SCHEME),
            None,
            &abs.to_string_lossy(),
        ))
    }

    fn mkdirs(&self, path: &Path) -> FsResult<bool> {
        fs::create_dir_all(self.local(path)?)?;
        Ok(true)
    }

    fn create(&self, path: &Path, overwrite: bool) -> FsResult<Box<dyn Writer>> {
        let local = self.local(path)?;
        if let Some(parent) = local.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut opts = OpenOptions::new();
        opts.write(true);
        if overwrite {
            opts.create(true).truncate(true);
        } else {
            opts.create_new(true);
        }

        let file = match opts.open(&local) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(FsError::file_exists(path.full_path()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Box::new(LocalWriter::new(path.clone(), file, self.buffer_size)))
    }

    fn append(&self, path: &Path) -> FsResult<Box<dyn Writer>> {
        let local = self.local(path)?;
        let file = OpenOptions::new().append(true).open(local)?;
        let len = file.metadata()?.len() as i64;
        let writer = LocalWriter::new(path.clone(), file, self.buffer_size).with_pos(len);
        Ok(Box::new(writer))
    }

    fn open(&self, path: &Path) -> FsResult<Box<dyn Reader>> {
        let local = self.local(path)?;
        if local.is_dir() {
            return Err(FsError::common(format!("{} is a directory", path)));
        }
        let file = match File::open(&local) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FsError::file_not_found(path.full_path()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Box::new(LocalReader::new(path.clone(), file)?))
    }

    fn exists(&self, path: &Path) -> FsResult<bool> {
        Ok(self.metadata(path)?.is_some())
    }

    fn is_file(&self, path: &Path) -> FsResult<bool> {
        Ok(matches!(self.metadata(path)?, Some(m) if m.is_file()))
    }

    fn is_dir(&self, path: &Path) -> FsResult<bool> {
        Ok(matches!(self.metadata(path)?, Some(m) if m.is_dir()))
    }

    fn get_status(&self, path: &Path) -> FsResult<FileStatus> {
        match self.metadata(path)? {
            Some(meta) => Ok(Self::to_status(path, &meta)),
            None => Err(FsError::file_not_found(path.full_path())),
        }
    }

    fn list_status(&self, path: &Path) -> FsResult<Vec<FileStatus>> {
        let meta = match self.metadata(path)? {
            Some(v) => v,
            None => return Err(FsError::file_not_found(path.full_path())),
        };
        if !meta.is_dir() {
            return Ok(vec![Self::to_status(path, &meta)]);
        }

        let mut res = vec![];
        for entry in fs::read_dir(self.local(path)?)? {
            let entry = entry?;
            let child = path.join(entry.file_name().to_string_lossy())?;
            res.push(Self::to_status(&child, &entry.metadata()?));
        }
        Ok(res)
    }

    fn delete(&self, path: &Path, recursive: bool) -> FsResult<bool> {
        let meta = match self.metadata(path)? {
            Some(v) => v,
            None => return Ok(false),
        };

        let local = self.local(path)?;
        if !meta.is_dir() {
            fs::remove_file(local)?;
        } else if recursive {
            fs::remove_dir_all(local)?;
        } else {
            fs::remove_dir(local)?;
        }
        Ok(true)
    }

    fn rename(&self, src: &Path, dst: &Path) -> FsResult<bool> {
        let (src, dst) = (self.local(src)?, self.local(dst)?);
        if !src.exists() || dst.exists() {
            return Ok(false);
        }
        fs::rename(src, dst)?;
        Ok(true)
    }
}
