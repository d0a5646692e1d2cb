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

use crate::irods::{FsStatistics, IrodsReader, IrodsWriter, RemoteFile, RemoteSession};
use crate::local::LocalFileSystem;
use crate::stream::{BufferedReader, StagedWriter};
use hirods_common::conf::HirodsConf;
use hirods_common::error::FsError;
use hirods_common::fs::{FileStatus, FileSystem, Path, Reader, Writer};
use hirods_common::utils::Utils;
use hirods_common::{err_box, FsResult};
use log::{debug, info};
use std::sync::{Arc, RwLock};

/// The remote store exposed through the generic filesystem surface.
///
/// Reads go through a [`BufferedReader`] window; writes go straight to the
/// store through a buffered remote writer, or through a [`StagedWriter`] when
/// `staged_writes` is set.
pub struct HirodsFileSystem {
    session: Arc<dyn RemoteSession>,
    conf: HirodsConf,
    authority: String,
    working_dir: RwLock<String>,
    staging_fs: Arc<dyn FileSystem>,
    stats: Arc<FsStatistics>,
}

impl HirodsFileSystem {
    pub const SCHEME: &'static str = "irods";
    pub const BLOCK_SIZE: i64 = 64 * 1024 * 1024;

    pub fn new(session: Arc<dyn RemoteSession>, conf: HirodsConf) -> FsResult<Self> {
        let staging_fs = Arc::new(LocalFileSystem::with_buffer_size(conf.output_buffer_size));
        Self::with_staging(session, conf, staging_fs)
    }

    pub fn with_staging(
        session: Arc<dyn RemoteSession>,
        conf: HirodsConf,
        staging_fs: Arc<dyn FileSystem>,
    ) -> FsResult<Self> {
        conf.check()?;
        let account = session.account();
        let authority = account.authority();
        let home = account.home_directory.clone();
        info!(
            "initialized {}://{} for {}, home {}",
            Self::SCHEME,
            authority,
            account.username,
            home
        );

        Ok(Self {
            session,
            conf,
            authority,
            working_dir: RwLock::new(home),
            staging_fs,
            stats: Arc::new(FsStatistics::new()),
        })
    }

    pub fn conf(&self) -> &HirodsConf {
        &self.conf
    }

    pub fn session(&self) -> &Arc<dyn RemoteSession> {
        &self.session
    }

    pub fn statistics(&self) -> &Arc<FsStatistics> {
        &self.stats
    }

    pub fn home_directory(&self) -> Path {
        let home = &self.session.account().home_directory;
        Path::from_parts(Some(Self::SCHEME), Some(self.authority.as_str()), home)
    }

    pub fn working_directory(&self) -> FsResult<Path> {
        let dir = self
            .working_dir
            .read()
            .map_err(|e| FsError::common(format!("Lock poisoned: {}", e)))?;
        Ok(Path::from_parts(Some(Self::SCHEME), Some(self.authority.as_str()), &dir))
    }

    pub fn set_working_directory(&self, path: &Path) -> FsResult<()> {
        let abs = self.remote_path(path)?;
        let mut dir = self
            .working_dir
            .write()
            .map_err(|e| FsError::common(format!("Lock poisoned: {}", e)))?;
        *dir = abs;
        Ok(())
    }

    // Absolute location of `path` inside the store.
    fn remote_path(&self, path: &Path) -> FsResult<String> {
        match path.scheme() {
            None | Some(Self::SCHEME) => (),
            Some(s) => {
                return Err(FsError::invalid_path(
                    path.full_path(),
                    format!("Wrong filesystem, expected {} but got {}", Self::SCHEME, s),
                ))
            }
        }

        if path.is_absolute() {
            Ok(path.path().to_string())
        } else {
            let dir = self
                .working_dir
                .read()
                .map_err(|e| FsError::common(format!("Lock poisoned: {}", e)))?;
            let joined = Path::new(dir.as_str())?.join(path.path())?;
            Ok(joined.path().to_string())
        }
    }

    pub fn file(&self, path: &Path) -> FsResult<RemoteFile> {
        Ok(RemoteFile::new(self.session.clone(), self.remote_path(path)?))
    }

    fn status(&self, path: &Path, file: &RemoteFile) -> FsResult<FileStatus> {
        let stat = match file.stat()? {
            Some(v) => v,
            None => return Err(FsError::file_not_found(path.full_path())),
        };

        let qualified = self.qualify(path)?;
        Ok(FileStatus {
            name: qualified.name().to_string(),
            path: qualified.full_path(),
            is_dir: stat.is_dir,
            len: if stat.is_dir { 0 } else { stat.len },
            mtime: stat.mtime,
            replicas: 1,
            block_size: Self::BLOCK_SIZE,
        })
    }

    /// Open with a window of at least `buffer_size` bytes.
    pub fn open_with_buffer(
        &self,
        path: &Path,
        buffer_size: usize,
    ) -> FsResult<BufferedReader<IrodsReader>> {
        let file = self.file(path)?;
        match file.stat()? {
            None => return Err(FsError::file_not_found(path.full_path())),
            Some(s) if s.is_dir => return err_box!("Path {} is a directory", path),
            _ => (),
        }

        let handle = self.session.open_random_access(file.path())?;
        let reader = IrodsReader::new(self.qualify(path)?, handle, self.stats.clone())?;
        let capacity = buffer_size.max(self.conf.input_buffer_size);
        debug!("open {} with a {} byte window", path, capacity);

        Ok(BufferedReader::with_policy(
            reader,
            capacity,
            self.conf.seek_policy,
        ))
    }

    fn staging_path(&self, path: &Path) -> FsResult<Path> {
        let root = Path::new(&self.conf.output_buffered_path)?;
        root.join(format!("{}/{}", Utils::uuid(), path.name()))
    }

    pub fn close(&self) -> FsResult<()> {
        info!("closing {}://{}, {}", Self::SCHEME, self.authority, self.stats);
        self.session.close()
    }
}

impl FileSystem for HirodsFileSystem {
    fn scheme(&self) -> &str {
        Self::SCHEME
    }

    fn supports_staged_commit(&self) -> bool {
        true
    }

    fn qualify(&self, path: &Path) -> FsResult<Path> {
        let abs = self.remote_path(path)?;
        Ok(Path::from_parts(
            Some(Self::SCHEME),
            Some(self.authority.as_str()),
            &abs,
        ))
    }

    fn mkdirs(&self, path: &Path) -> FsResult<bool> {
        let file = self.file(path)?;
        if file.is_dir()? {
            return Ok(true);
        }
        file.mkdirs()
    }

    fn create(&self, path: &Path, overwrite: bool) -> FsResult<Box<dyn Writer>> {
        let file = self.file(path)?;
        match file.stat()? {
            Some(s) if s.is_dir => return err_box!("Path {} is a directory", path),
            Some(_) if !overwrite => return Err(FsError::file_exists(path.full_path())),
            Some(_) => {
                file.delete(false)?;
            }
            None => {
                if let Some(parent) = file.parent() {
                    if !parent.is_dir()? && !parent.mkdirs()? {
                        return err_box!("Mkdirs failed to create {}", parent.path());
                    }
                }
            }
        }

        let qualified = self.qualify(path)?;
        if self.conf.staged_writes {
            let writer = StagedWriter::new(
                qualified,
                file.path(),
                self.session.clone(),
                self.staging_fs.clone(),
                self.staging_path(path)?,
                self.conf.output_buffer_size,
                self.stats.clone(),
            )?;
            Ok(Box::new(writer))
        } else {
            let out = self.session.open_output(file.path())?;
            let writer = IrodsWriter::new(
                qualified,
                out,
                self.conf.output_buffer_size,
                self.stats.clone(),
            );
            Ok(Box::new(writer))
        }
    }

    fn append(&self, path: &Path) -> FsResult<Box<dyn Writer>> {
        Err(FsError::unsupported(format!("append {}", path)))
    }

    fn open(&self, path: &Path) -> FsResult<Box<dyn Reader>> {
        let reader = self.open_with_buffer(path, self.conf.input_buffer_size)?;
        Ok(Box::new(reader))
    }

    fn exists(&self, path: &Path) -> FsResult<bool> {
        self.file(path)?.exists()
    }

    fn is_file(&self, path: &Path) -> FsResult<bool> {
        self.file(path)?.is_file()
    }

    fn is_dir(&self, path: &Path) -> FsResult<bool> {
        self.file(path)?.is_dir()
    }

    fn get_status(&self, path: &Path) -> FsResult<FileStatus> {
        let file = self.file(path)?;
        self.status(path, &file)
    }

    fn list_status(&self, path: &Path) -> FsResult<Vec<FileStatus>> {
        let file = self.file(path)?;
        let stat = self.status(path, &file)?;
        if !stat.is_dir {
            return Ok(vec![stat]);
        }

        let mut res = vec![];
        for name in file.list()? {
            let child = path.join(&name)?;
            res.push(self.status(&child, &file.child(&name))?);
        }
        Ok(res)
    }

    fn delete(&self, path: &Path, recursive: bool) -> FsResult<bool> {
        self.file(path)?.delete(recursive)
    }

    /// Returns false when the source is missing, the destination exists, or
    /// the destination's parent is missing or a file. A directory destination
    /// receives the source under its own name.
    fn rename(&self, src: &Path, dst: &Path) -> FsResult<bool> {
        let src = self.file(src)?;
        let mut dst = self.file(dst)?;

        if !src.exists()? {
            return Ok(false);
        }
        if dst.is_dir()? {
            dst = dst.child(src.name());
        }
        if dst.exists()? {
            return Ok(false);
        }
        if let Some(parent) = dst.parent() {
            if !parent.is_dir()? {
                return Ok(false);
            }
        }

        src.rename(&dst)
    }
}
