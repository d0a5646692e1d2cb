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

use std::io;
use thiserror::Error;

/// Errors surfaced by the streams, the filesystems and the commit protocol.
///
/// Every failure reaches the host framework as a plain I/O failure carrying
/// its cause; the variants only exist so callers inside this workspace can
/// tell a missing file from a broken remote connection.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("{0}")]
    IO(#[from] io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Stream closed: {0}")]
    StreamClosed(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Remote store error: {0}")]
    Ufs(String),

    #[error("Configuration error: {0}")]
    Conf(String),

    #[error("{0}")]
    Common(String),
}

impl FsError {
    pub fn common(msg: impl Into<String>) -> Self {
        Self::Common(msg.into())
    }

    pub fn ufs(msg: impl Into<String>) -> Self {
        Self::Ufs(msg.into())
    }

    pub fn conf(msg: impl Into<String>) -> Self {
        Self::Conf(msg.into())
    }

    pub fn invalid_path(path: impl AsRef<str>, reason: impl AsRef<str>) -> Self {
        Self::InvalidPath(format!("{}: {}", path.as_ref(), reason.as_ref()))
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn file_exists(path: impl Into<String>) -> Self {
        Self::FileAlreadyExists(path.into())
    }

    pub fn unsupported(op: impl Into<String>) -> Self {
        Self::Unsupported(op.into())
    }

    pub fn stream_closed(path: impl Into<String>) -> Self {
        Self::StreamClosed(path.into())
    }

    /// Prefix the message with `ctx`, keeping the variant.
    pub fn ctx(self, ctx: impl AsRef<str>) -> Self {
        let ctx = ctx.as_ref();
        match self {
            Self::IO(e) => Self::IO(io::Error::new(e.kind(), format!("{}: {}", ctx, e))),
            Self::FileNotFound(m) => Self::FileNotFound(format!("{}: {}", ctx, m)),
            Self::FileAlreadyExists(m) => Self::FileAlreadyExists(format!("{}: {}", ctx, m)),
            Self::InvalidPath(m) => Self::InvalidPath(format!("{}: {}", ctx, m)),
            Self::StreamClosed(m) => Self::StreamClosed(format!("{}: {}", ctx, m)),
            Self::Unsupported(m) => Self::Unsupported(format!("{}: {}", ctx, m)),
            Self::Ufs(m) => Self::Ufs(format!("{}: {}", ctx, m)),
            Self::Conf(m) => Self::Conf(format!("{}: {}", ctx, m)),
            Self::Common(m) => Self::Common(format!("{}: {}", ctx, m)),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FileNotFound(_) => true,
            Self::IO(e) => e.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<FsError> for io::Error {
    fn from(value: FsError) -> Self {
        match value {
            FsError::IO(e) => e,
            FsError::FileNotFound(_) => io::Error::new(io::ErrorKind::NotFound, value),
            FsError::FileAlreadyExists(_) => io::Error::new(io::ErrorKind::AlreadyExists, value),
            FsError::InvalidPath(_) | FsError::Conf(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, value)
            }
            FsError::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, value),
            _ => io::Error::new(io::ErrorKind::Other, value),
        }
    }
}

impl From<toml::de::Error> for FsError {
    fn from(value: toml::de::Error) -> Self {
        Self::Conf(value.to_string())
    }
}

impl From<url::ParseError> for FsError {
    fn from(value: url::ParseError) -> Self {
        Self::InvalidPath(value.to_string())
    }
}

impl From<String> for FsError {
    fn from(value: String) -> Self {
        Self::Common(value)
    }
}

impl From<&str> for FsError {
    fn from(value: &str) -> Self {
        Self::Common(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::FsError;
    use std::io;

    #[test]
    fn ctx_keeps_variant() {
        let err = FsError::file_not_found("/a/b").ctx("open");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "File not found: open: /a/b");
    }

    #[test]
    fn io_conversion() {
        let err: io::Error = FsError::file_exists("/x").into();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

        let err: io::Error = FsError::stream_closed("/x").into();
        assert_eq!(err.kind(), io::ErrorKind::Other);

        let err: FsError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(err.is_not_found());
    }
}
