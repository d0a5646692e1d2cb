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

use crate::error::FsError;
use crate::FsResult;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A filesystem path in URI form: `scheme://authority/a/b`, or a bare
/// `/a/b` / `a/b` for the local filesystem.
///
/// The path component is normalized on construction: repeated separators and
/// `.` segments are dropped, `..` pops the previous segment, and there is no
/// trailing separator except for the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Path {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
}

impl Path {
    pub const SEPARATOR: &'static str = "/";
    const SCHEME_DELIMITER: &'static str = "://";

    pub fn new(s: impl AsRef<str>) -> FsResult<Self> {
        let s = s.as_ref().trim();
        if s.is_empty() {
            return Err(FsError::invalid_path(s, "Can not create a path from an empty string"));
        }

        match s.find(Self::SCHEME_DELIMITER) {
            Some(idx) => {
                let scheme = &s[..idx];
                if scheme.is_empty()
                    || !scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
                {
                    return Err(FsError::invalid_path(s, "Invalid scheme"));
                }

                let rest = &s[idx + Self::SCHEME_DELIMITER.len()..];
                let (authority, path) = match rest.find('/') {
                    Some(i) => (&rest[..i], &rest[i..]),
                    None => (rest, Self::SEPARATOR),
                };

                let authority = if authority.is_empty() {
                    None
                } else {
                    Some(authority.to_string())
                };

                Ok(Self {
                    scheme: Some(scheme.to_lowercase()),
                    authority,
                    path: Self::normalize(path),
                })
            }

            None => Ok(Self {
                scheme: None,
                authority: None,
                path: Self::normalize(s),
            }),
        }
    }

    /// Build a path from components; `path` is normalized.
    pub fn from_parts(scheme: Option<&str>, authority: Option<&str>, path: &str) -> Self {
        Self {
            scheme: scheme.map(|x| x.to_lowercase()),
            authority: authority.filter(|x| !x.is_empty()).map(|x| x.to_string()),
            path: Self::normalize(path),
        }
    }

    fn normalize(path: &str) -> String {
        let absolute = path.starts_with('/');
        let mut segments: Vec<&str> = Vec::new();
        for seg in path.split('/') {
            match seg {
                "" | "." => (),
                ".." => {
                    if segments.last().map(|x| *x != "..").unwrap_or(false) {
                        segments.pop();
                    } else if !absolute {
                        segments.push(seg);
                    }
                }
                _ => segments.push(seg),
            }
        }

        let joined = segments.join(Self::SEPARATOR);
        if absolute {
            format!("/{}", joined)
        } else if joined.is_empty() {
            ".".to_string()
        } else {
            joined
        }
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    /// The path component without scheme and authority.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn full_path(&self) -> String {
        match (&self.scheme, &self.authority) {
            (Some(scheme), Some(auth)) => format!("{}://{}{}", scheme, auth, self.path),
            (Some(scheme), None) => format!("{}://{}", scheme, self.path),
            _ => self.path.clone(),
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.path.starts_with('/')
    }

    pub fn is_root(&self) -> bool {
        self.path == Self::SEPARATOR
    }

    /// Last path segment, empty for the root.
    pub fn name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        match self.path.rfind('/') {
            Some(i) => &self.path[i + 1..],
            None => &self.path,
        }
    }

    pub fn parent(&self) -> Option<Path> {
        if self.is_root() {
            return None;
        }

        let parent = match self.path.rfind('/') {
            Some(0) => Self::SEPARATOR.to_string(),
            Some(i) => self.path[..i].to_string(),
            None => return None,
        };

        Some(Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: parent,
        })
    }

    /// Resolve a relative child against this path. An absolute `child` keeps
    /// this path's scheme and authority.
    pub fn join(&self, child: impl AsRef<str>) -> FsResult<Path> {
        let child = child.as_ref();
        if child.contains(Self::SCHEME_DELIMITER) {
            return Err(FsError::invalid_path(child, "Child path must not carry a scheme"));
        }

        let joined = if child.starts_with('/') {
            child.to_string()
        } else if child.is_empty() {
            self.path.clone()
        } else {
            format!("{}/{}", self.path, child)
        };

        Ok(Self {
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: Self::normalize(&joined),
        })
    }

    /// Express `child` relative to this path.
    ///
    /// Returns `None` when the scheme or authority differ, or when `child` is
    /// not this path or a descendant of it. Relativizing a path against
    /// itself yields an empty string.
    pub fn relativize(&self, child: &Path) -> Option<String> {
        if self.scheme != child.scheme || self.authority != child.authority {
            return None;
        }

        if child.path == self.path {
            return Some(String::new());
        }

        let prefix = if self.path.ends_with('/') {
            self.path.clone()
        } else {
            format!("{}/", self.path)
        };

        child.path.strip_prefix(&prefix).map(|x| x.to_string())
    }
}

impl FromStr for Path {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_path())
    }
}

#[cfg(test)]
mod tests {
    use super::Path;

    #[test]
    fn parse() {
        let p = Path::new("irods://alice:pw@data.example.org:1247/tempZone/home/alice/").unwrap();
        assert_eq!(p.scheme(), Some("irods"));
        assert_eq!(p.authority(), Some("alice:pw@data.example.org:1247"));
        assert_eq!(p.path(), "/tempZone/home/alice");
        assert_eq!(p.name(), "alice");

        let p = Path::new("/tmp//job-stage/./a/../b").unwrap();
        assert_eq!(p.scheme(), None);
        assert_eq!(p.path(), "/tmp/job-stage/b");

        let p = Path::new("hirods_temp/").unwrap();
        assert!(!p.is_absolute());
        assert_eq!(p.path(), "hirods_temp");

        assert!(Path::new("").is_err());
        assert!(Path::new("://x").is_err());
    }

    #[test]
    fn parent_and_join() {
        let p = Path::new("irods://host/zone/a/b.txt").unwrap();
        let parent = p.parent().unwrap();
        assert_eq!(parent.full_path(), "irods://host/zone/a");
        assert_eq!(parent.join("b.txt").unwrap(), p);
        assert_eq!(Path::new("/a").unwrap().parent().unwrap().path(), "/");
        assert!(Path::new("/").unwrap().parent().is_none());
        assert!(p.join("irods://other/x").is_err());
    }

    #[test]
    fn relativize() {
        let base = Path::new("/tmp/job-stage/_temporary/_attempt_1").unwrap();
        let child = base.join("a/1.txt").unwrap();
        assert_eq!(base.relativize(&child).as_deref(), Some("a/1.txt"));
        assert_eq!(base.relativize(&base).as_deref(), Some(""));

        // A sibling sharing a name prefix is not a descendant.
        let sibling = Path::new("/tmp/job-stage/_temporary/_attempt_10/x").unwrap();
        assert_eq!(base.relativize(&sibling), None);

        let remote = Path::new("irods://host/tmp/job-stage/_temporary/_attempt_1/a").unwrap();
        assert_eq!(base.relativize(&remote), None);

        let root = Path::new("/").unwrap();
        assert_eq!(root.relativize(&child).as_deref(), Some(&child.path()[1..]));
    }
}
