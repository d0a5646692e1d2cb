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

use rand::RngCore;
use std::path::PathBuf;

pub struct Utils;

impl Utils {
    pub const TEST_ROOT: &'static str = "hirods-testing";

    pub fn uuid() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    pub fn rand_bytes(len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut buf);
        buf
    }

    /// A fresh, empty scratch directory `<tmp>/hirods-testing/<name>-<uuid>`.
    /// Each call returns a new directory, so tests running in parallel never
    /// share one.
    pub fn test_sub_dir(name: impl AsRef<str>) -> String {
        let dir = std::env::temp_dir()
            .join(Self::TEST_ROOT)
            .join(format!("{}-{}", name.as_ref(), Self::uuid()));
        let _ = std::fs::remove_dir_all(&dir);
        let _ = std::fs::create_dir_all(&dir);
        dir.to_string_lossy().to_string()
    }

    /// Path of a file in a fresh scratch directory; the file is not created.
    pub fn test_file(name: impl AsRef<str>) -> String {
        let dir = PathBuf::from(Self::test_sub_dir("file"));
        dir.join(name.as_ref()).to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::Utils;
    use std::path::Path;

    #[test]
    fn sub_dir() {
        let a = Utils::test_sub_dir("utils");
        let b = Utils::test_sub_dir("utils");
        assert_ne!(a, b);
        assert!(Path::new(&a).is_dir());

        let f = Utils::test_file("x.bin");
        assert!(!Path::new(&f).exists());
        assert!(Path::new(&f).parent().unwrap().is_dir());

        assert_eq!(Utils::rand_bytes(17).len(), 17);
    }
}
