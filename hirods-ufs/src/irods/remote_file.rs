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

use crate::irods::{RemoteSession, RemoteStat};
use hirods_common::FsResult;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A path on the remote store bound to the session that serves it.
#[derive(Clone)]
pub struct RemoteFile {
    session: Arc<dyn RemoteSession>,
    path: String,
}

impl RemoteFile {
    pub fn new(session: Arc<dyn RemoteSession>, path: impl Into<String>) -> Self {
        Self {
            session,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        match self.path.trim_end_matches('/').rfind('/') {
            Some(i) => &self.path[i + 1..],
            None => &self.path,
        }
    }

    pub fn session(&self) -> &Arc<dyn RemoteSession> {
        &self.session
    }

    pub fn child(&self, name: &str) -> RemoteFile {
        let path = if self.path.ends_with('/') {
            format!("{}{}", self.path, name)
        } else {
            format!("{}/{}", self.path, name)
        };
        Self::new(self.session.clone(), path)
    }

    pub fn parent(&self) -> Option<RemoteFile> {
        let trimmed = self.path.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) if trimmed.len() > 1 => Some(Self::new(self.session.clone(), "/")),
            Some(i) if i > 0 => Some(Self::new(self.session.clone(), &trimmed[..i])),
            _ => None,
        }
    }

    pub fn stat(&self) -> FsResult<Option<RemoteStat>> {
        self.session.stat(&self.path)
    }

    pub fn exists(&self) -> FsResult<bool> {
        Ok(self.stat()?.is_some())
    }

    pub fn is_file(&self) -> FsResult<bool> {
        Ok(matches!(self.stat()?, Some(s) if !s.is_dir))
    }

    pub fn is_dir(&self) -> FsResult<bool> {
        Ok(matches!(self.stat()?, Some(s) if s.is_dir))
    }

    pub fn length(&self) -> FsResult<i64> {
        Ok(self.stat()?.map(|s| s.len).unwrap_or(0))
    }

    pub fn list(&self) -> FsResult<Vec<String>> {
        self.session.list(&self.path)
    }

    pub fn list_files(&self) -> FsResult<Vec<RemoteFile>> {
        Ok(self.list()?.iter().map(|x| self.child(x)).collect())
    }

    pub fn mkdirs(&self) -> FsResult<bool> {
        self.session.mkdirs(&self.path)
    }

    /// Delete this entry; directories are removed depth-first when
    /// `recursive` is set. Returns false when nothing was removed.
    pub fn delete(&self, recursive: bool) -> FsResult<bool> {
        let stat = match self.stat()? {
            Some(v) => v,
            None => return Ok(false),
        };

        if stat.is_dir && recursive {
            for child in self.list_files()? {
                child.delete(true)?;
            }
        }

        self.session.delete(&self.path)
    }

    pub fn rename(&self, dst: &RemoteFile) -> FsResult<bool> {
        self.session.rename(&self.path, &dst.path)
    }
}

impl Debug for RemoteFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteFile").field("path", &self.path).finish()
    }
}
