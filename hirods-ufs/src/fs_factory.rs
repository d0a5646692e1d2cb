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

use crate::irods::{HirodsFileSystem, RemoteSession};
use crate::local::LocalFileSystem;
use hirods_common::conf::HirodsConf;
use hirods_common::error::FsError;
use hirods_common::fs::{FileSystem, Path};
use hirods_common::FsResult;
use std::sync::Arc;

/// Maps a path's scheme to the filesystem that serves it. Built once per
/// process from a configuration and an optional open session.
#[derive(Clone)]
pub struct FsFactory {
    local: Arc<LocalFileSystem>,
    remote: Option<Arc<HirodsFileSystem>>,
}

impl FsFactory {
    pub fn new(conf: &HirodsConf, session: Option<Arc<dyn RemoteSession>>) -> FsResult<Self> {
        let local = Arc::new(LocalFileSystem::with_buffer_size(conf.output_buffer_size));
        let remote = match session {
            Some(session) => Some(Arc::new(HirodsFileSystem::with_staging(
                session,
                conf.clone(),
                local.clone(),
            )?)),
            None => None,
        };

        Ok(Self { local, remote })
    }

    pub fn local(&self) -> Arc<dyn FileSystem> {
        self.local.clone()
    }

    pub fn remote(&self) -> FsResult<Arc<HirodsFileSystem>> {
        match &self.remote {
            Some(v) => Ok(v.clone()),
            None => Err(FsError::conf("No remote session is configured")),
        }
    }

    /// Paths without a scheme resolve to the local filesystem.
    pub fn get(&self, path: &Path) -> FsResult<Arc<dyn FileSystem>> {
        match path.scheme() {
            None | Some(LocalFileSystem::SCHEME) => Ok(self.local()),
            Some(HirodsFileSystem::SCHEME) => Ok(self.remote()?),
            Some(s) => Err(FsError::unsupported(format!("No filesystem for scheme {}", s))),
        }
    }
}
