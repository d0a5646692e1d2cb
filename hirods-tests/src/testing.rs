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

use crate::MemSession;
use hirods_common::conf::HirodsConf;
use hirods_common::fs::Path;
use hirods_common::utils::{Logger, Utils};
use hirods_common::FsResult;
use hirods_ufs::irods::{HirodsFileSystem, IrodsAccount, RemoteSession};
use hirods_ufs::FsFactory;
use std::sync::Arc;

/// A remote store in memory plus a fresh local scratch directory.
pub struct Testing {
    pub root: String,
    pub conf: HirodsConf,
    pub session: Arc<MemSession>,
}

impl Testing {
    pub const HOST: &'static str = "localhost";
    pub const ZONE: &'static str = "tempZone";
    pub const USER: &'static str = "rods";
    pub const HOME: &'static str = "/tempZone/home/rods";

    pub fn account() -> IrodsAccount {
        IrodsAccount {
            host: Self::HOST.to_string(),
            port: HirodsConf::DEFAULT_PORT,
            zone: Self::ZONE.to_string(),
            username: Self::USER.to_string(),
            password: "rods".to_string(),
            home_directory: Self::HOME.to_string(),
            default_resource: "".to_string(),
        }
    }

    pub fn new(name: &str) -> Self {
        Self::with_conf(name, |_| ())
    }

    /// `f` adjusts the configuration after the account and staging keys are
    /// filled in.
    pub fn with_conf(name: &str, f: impl FnOnce(&mut HirodsConf)) -> Self {
        Logger::default();

        let root = Utils::test_sub_dir(name);
        let mut conf = HirodsConf {
            host: Some(Self::HOST.to_string()),
            zone: Some(Self::ZONE.to_string()),
            username: Some(Self::USER.to_string()),
            password: Some("rods".to_string()),
            output_buffered_path: format!("{}/staging", root),
            ..Default::default()
        };
        f(&mut conf);

        Self {
            root,
            conf,
            session: Arc::new(MemSession::new(Self::account())),
        }
    }

    pub fn remote_session(&self) -> Arc<dyn RemoteSession> {
        self.session.clone()
    }

    pub fn factory(&self) -> FsResult<FsFactory> {
        FsFactory::new(&self.conf, Some(self.remote_session()))
    }

    pub fn remote_fs(&self) -> FsResult<Arc<HirodsFileSystem>> {
        self.factory()?.remote()
    }

    /// `irods://localhost:1247/tempZone/home/rods/<rel>`
    pub fn remote_path(&self, rel: &str) -> Path {
        let abs = format!("{}/{}", Self::HOME, rel);
        Path::from_parts(
            Some(HirodsFileSystem::SCHEME),
            Some(Self::account().authority().as_str()),
            &abs,
        )
    }

    /// Location of `rel` inside the store, as the session sees it.
    pub fn store_path(&self, rel: &str) -> String {
        format!("{}/{}", Self::HOME, rel)
    }

    pub fn local_path(&self, rel: &str) -> FsResult<Path> {
        Path::new(format!("{}/{}", self.root, rel))
    }

    pub fn staging_dir(&self) -> String {
        self.conf.output_buffered_path.clone()
    }
}
