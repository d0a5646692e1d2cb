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

use crate::conf::LogConf;
use crate::error::FsError;
use crate::{FsResult, FILE_BUFFER_SIZE};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How a buffered reader handles `seek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeekPolicy {
    /// Seeks inside the resident window only move the cursor; any other seek
    /// repositions the remote handle and drops the window. The fetch happens
    /// on the next read.
    #[default]
    Window,

    /// Every seek repositions the remote handle and drops the window.
    Invalidate,
}

/// When the staged commit protocol gives way to the host default committer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CommitFallback {
    /// Fall back when the output filesystem lacks the staged-commit capability.
    #[default]
    Capability,

    /// Always use the staged protocol.
    Never,
}

macro_rules! impl_str_enum {
    ($ty:ty, $($name:literal => $val:path),+) => {
        impl FromStr for $ty {
            type Err = FsError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($name => Ok($val),)+
                    v => Err(FsError::conf(format!("Unknown {} value: {}", stringify!($ty), v))),
                }
            }
        }

        impl Display for $ty {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $($val => $name,)+
                };
                write!(f, "{}", s)
            }
        }
    };
}

impl_str_enum!(SeekPolicy, "window" => SeekPolicy::Window, "invalidate" => SeekPolicy::Invalidate);
impl_str_enum!(CommitFallback, "capability" => CommitFallback::Capability, "never" => CommitFallback::Never);

/// Connection, buffering and commit settings for the remote store bridge.
///
/// Loaded from a TOML file, or from the key/value store of the host framework
/// through [`HirodsConf::with_map`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HirodsConf {
    pub host: Option<String>,
    pub port: u16,
    pub zone: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,

    // Defaults to /<zone>/home/<user> when unset.
    pub home_directory: Option<String>,
    pub default_resource: String,

    pub input_buffer_size: usize,
    pub output_buffer_size: usize,

    // Root of the local staging area used by staged writes.
    pub output_buffered_path: String,
    pub staged_writes: bool,

    pub seek_policy: SeekPolicy,
    pub commit_fallback: CommitFallback,

    pub log: LogConf,
}

impl HirodsConf {
    pub const ENV_CONF_FILE: &'static str = "HIRODS_CONF_FILE";

    pub const KEY_PREFIX: &'static str = "fs.irods.";
    pub const HOST: &'static str = "fs.irods.host";
    pub const PORT: &'static str = "fs.irods.port";
    pub const ZONE: &'static str = "fs.irods.zone";
    pub const USERNAME: &'static str = "fs.irods.account.username";
    pub const PASSWORD: &'static str = "fs.irods.account.password";
    pub const HOME_DIRECTORY: &'static str = "fs.irods.account.homedir";
    pub const DEFAULT_RESOURCE: &'static str = "fs.irods.account.resource";
    pub const INPUT_BUFFER_SIZE: &'static str = "fs.irods.input.buffer.size";
    pub const OUTPUT_BUFFER_SIZE: &'static str = "fs.irods.output.buffer.size";
    pub const OUTPUT_BUFFERED_PATH: &'static str = "fs.irods.output.buffered.path";
    // Older name of OUTPUT_BUFFERED_PATH, still set by existing job configs.
    pub const OUTPUT_FILEBUFFER_DIR: &'static str = "fs.irods.output.hdfs_filebuffer.dir";
    pub const STAGED_WRITES: &'static str = "fs.irods.output.staged";
    pub const SEEK_POLICY: &'static str = "fs.irods.input.seek.policy";
    pub const COMMIT_FALLBACK: &'static str = "fs.irods.output.commit.fallback";

    pub const DEFAULT_PORT: u16 = 1247;
    pub const DEFAULT_OUTPUT_BUFFERED_PATH: &'static str = "hirods_temp/";

    pub fn from_str<T: AsRef<str>>(s: T) -> FsResult<Self> {
        let conf = toml::from_str::<Self>(s.as_ref())?;
        conf.check()?;
        Ok(conf)
    }

    pub fn from_file<T: AsRef<str>>(path: T) -> FsResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| FsError::conf(format!("Failed to read {}: {}", path, e)))?;
        Self::from_str(content)
    }

    /// Load from the file named by `HIRODS_CONF_FILE`, or use the defaults.
    pub fn from_env() -> FsResult<Self> {
        match std::env::var(Self::ENV_CONF_FILE) {
            Ok(path) if !path.is_empty() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    const KEYS: [&'static str; 14] = [
        Self::HOST,
        Self::PORT,
        Self::ZONE,
        Self::USERNAME,
        Self::PASSWORD,
        Self::HOME_DIRECTORY,
        Self::DEFAULT_RESOURCE,
        Self::INPUT_BUFFER_SIZE,
        Self::OUTPUT_BUFFER_SIZE,
        Self::OUTPUT_BUFFERED_PATH,
        Self::OUTPUT_FILEBUFFER_DIR,
        Self::STAGED_WRITES,
        Self::SEEK_POLICY,
        Self::COMMIT_FALLBACK,
    ];

    pub fn is_known_key(key: &str) -> bool {
        Self::KEYS.contains(&key)
    }

    /// Build from a host framework key/value store. Only known `fs.irods.`
    /// keys are read; the host keeps others in the same namespace, such as
    /// `fs.irods.impl`. `fs.irods.output.buffered.path` wins over its older
    /// name when both are set.
    pub fn with_map(map: &HashMap<String, String>) -> FsResult<Self> {
        let mut conf = Self::default();
        for (k, v) in map {
            if !k.starts_with(Self::KEY_PREFIX) {
                continue;
            }
            if !Self::is_known_key(k) {
                debug!("Skipping configuration key {}", k);
                continue;
            }
            if k == Self::OUTPUT_FILEBUFFER_DIR && map.contains_key(Self::OUTPUT_BUFFERED_PATH) {
                continue;
            }
            conf.set(k, v)?;
        }
        conf.check()?;
        Ok(conf)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            Self::HOST => self.host.clone(),
            Self::PORT => Some(self.port.to_string()),
            Self::ZONE => self.zone.clone(),
            Self::USERNAME => self.username.clone(),
            Self::PASSWORD => self.password.clone(),
            Self::HOME_DIRECTORY => self.home_directory.clone(),
            Self::DEFAULT_RESOURCE => Some(self.default_resource.clone()),
            Self::INPUT_BUFFER_SIZE => Some(self.input_buffer_size.to_string()),
            Self::OUTPUT_BUFFER_SIZE => Some(self.output_buffer_size.to_string()),
            Self::OUTPUT_BUFFERED_PATH | Self::OUTPUT_FILEBUFFER_DIR => {
                Some(self.output_buffered_path.clone())
            }
            Self::STAGED_WRITES => Some(self.staged_writes.to_string()),
            Self::SEEK_POLICY => Some(self.seek_policy.to_string()),
            Self::COMMIT_FALLBACK => Some(self.commit_fallback.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: impl AsRef<str>) -> FsResult<()> {
        let value = value.as_ref().trim();
        let opt = || {
            if value.is_empty() {
                None
            } else {
                Some(value.to_string())
            }
        };

        match key {
            Self::HOST => self.host = opt(),
            Self::PORT => self.port = Self::parse(key, value)?,
            Self::ZONE => self.zone = opt(),
            Self::USERNAME => self.username = opt(),
            Self::PASSWORD => self.password = opt(),
            Self::HOME_DIRECTORY => self.home_directory = opt(),
            Self::DEFAULT_RESOURCE => self.default_resource = value.to_string(),
            Self::INPUT_BUFFER_SIZE => self.input_buffer_size = Self::parse(key, value)?,
            Self::OUTPUT_BUFFER_SIZE => self.output_buffer_size = Self::parse(key, value)?,
            Self::OUTPUT_BUFFERED_PATH | Self::OUTPUT_FILEBUFFER_DIR => {
                self.output_buffered_path = value.to_string()
            }
            Self::STAGED_WRITES => self.staged_writes = Self::parse(key, value)?,
            Self::SEEK_POLICY => self.seek_policy = value.parse()?,
            Self::COMMIT_FALLBACK => self.commit_fallback = value.parse()?,
            _ => return Err(FsError::conf(format!("Unknown configuration key {}", key))),
        }
        Ok(())
    }

    fn parse<T: FromStr>(key: &str, value: &str) -> FsResult<T> {
        value
            .parse::<T>()
            .map_err(|_| FsError::conf(format!("Invalid value for {}: {}", key, value)))
    }

    pub fn check(&self) -> FsResult<()> {
        if self.input_buffer_size == 0 || self.output_buffer_size == 0 {
            return Err(FsError::conf("Buffer sizes must be greater than 0"));
        }
        if self.output_buffered_path.trim().is_empty() {
            return Err(FsError::conf(format!(
                "{} must not be empty",
                Self::OUTPUT_BUFFERED_PATH
            )));
        }
        Ok(())
    }

    /// Home directory, falling back to `/<zone>/home/<user>`.
    pub fn home_directory(&self) -> Option<String> {
        match (&self.home_directory, &self.zone, &self.username) {
            (Some(home), _, _) => Some(home.clone()),
            (None, Some(zone), Some(user)) => Some(format!("/{}/home/{}", zone, user)),
            _ => None,
        }
    }
}

impl Default for HirodsConf {
    fn default() -> Self {
        Self {
            host: None,
            port: Self::DEFAULT_PORT,
            zone: None,
            username: None,
            password: None,
            home_directory: None,
            default_resource: "".to_string(),

            input_buffer_size: FILE_BUFFER_SIZE,
            output_buffer_size: FILE_BUFFER_SIZE,

            output_buffered_path: Self::DEFAULT_OUTPUT_BUFFERED_PATH.to_string(),
            staged_writes: false,

            seek_policy: SeekPolicy::Window,
            commit_fallback: CommitFallback::Capability,

            log: LogConf::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let conf = HirodsConf::default();
        assert_eq!(conf.port, 1247);
        assert_eq!(conf.input_buffer_size, 100 * 1024);
        assert_eq!(conf.output_buffered_path, "hirods_temp/");
        assert_eq!(conf.seek_policy, SeekPolicy::Window);
        assert_eq!(conf.commit_fallback, CommitFallback::Capability);
        assert!(conf.home_directory().is_none());
    }

    #[test]
    fn toml() {
        let conf = HirodsConf::from_str(
            r#"
            host = "data.example.org"
            zone = "tempZone"
            username = "alice"
            input_buffer_size = 4096
            seek_policy = "invalidate"
            "#,
        )
        .unwrap();
        assert_eq!(conf.host.as_deref(), Some("data.example.org"));
        assert_eq!(conf.port, 1247);
        assert_eq!(conf.input_buffer_size, 4096);
        assert_eq!(conf.seek_policy, SeekPolicy::Invalidate);
        assert_eq!(conf.home_directory().as_deref(), Some("/tempZone/home/alice"));

        assert!(HirodsConf::from_str("input_buffer_size = 0").is_err());
    }

    #[test]
    fn key_value() {
        let mut map = HashMap::new();
        map.insert(HirodsConf::PORT.to_string(), "2247".to_string());
        map.insert(HirodsConf::STAGED_WRITES.to_string(), "true".to_string());
        map.insert(HirodsConf::COMMIT_FALLBACK.to_string(), "never".to_string());
        map.insert("mapred.output.dir".to_string(), "/out".to_string());

        let mut conf = HirodsConf::with_map(&map).unwrap();
        assert_eq!(conf.port, 2247);
        assert!(conf.staged_writes);
        assert_eq!(conf.commit_fallback, CommitFallback::Never);
        assert_eq!(conf.get(HirodsConf::COMMIT_FALLBACK).as_deref(), Some("never"));

        conf.set(HirodsConf::HOME_DIRECTORY, "/z/home/shared").unwrap();
        assert_eq!(conf.home_directory().as_deref(), Some("/z/home/shared"));

        assert!(conf.set(HirodsConf::PORT, "not-a-port").is_err());
        assert!(conf.set("fs.irods.unknown", "1").is_err());
    }

    #[test]
    fn host_keys_are_skipped() {
        let mut map = HashMap::new();
        map.insert("fs.irods.impl".to_string(), "hirods.HirodsFileSystem".to_string());
        map.insert(HirodsConf::OUTPUT_FILEBUFFER_DIR.to_string(), "/tmp/buf".to_string());

        let conf = HirodsConf::with_map(&map).unwrap();
        assert_eq!(conf.output_buffered_path, "/tmp/buf");
        assert_eq!(conf.get(HirodsConf::OUTPUT_FILEBUFFER_DIR).as_deref(), Some("/tmp/buf"));

        map.insert(HirodsConf::OUTPUT_BUFFERED_PATH.to_string(), "/tmp/staging".to_string());
        let conf = HirodsConf::with_map(&map).unwrap();
        assert_eq!(conf.output_buffered_path, "/tmp/staging");

        // Known keys with bad values still fail.
        map.insert(HirodsConf::PORT.to_string(), "x".to_string());
        assert!(HirodsConf::with_map(&map).is_err());
    }
}
