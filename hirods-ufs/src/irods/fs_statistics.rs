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

use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicI64, Ordering};

/// Per-filesystem I/O counters, shared by every stream it opens.
#[derive(Debug, Default)]
pub struct FsStatistics {
    bytes_read: AtomicI64,
    bytes_written: AtomicI64,
    read_ops: AtomicI64,
    write_ops: AtomicI64,
}

impl FsStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_bytes_read(&self, n: i64) {
        self.bytes_read.fetch_add(n, Ordering::Relaxed);
        self.read_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_bytes_written(&self, n: i64) {
        self.bytes_written.fetch_add(n, Ordering::Relaxed);
        self.write_ops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self) -> i64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    pub fn bytes_written(&self) -> i64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    pub fn read_ops(&self) -> i64 {
        self.read_ops.load(Ordering::Relaxed)
    }

    pub fn write_ops(&self) -> i64 {
        self.write_ops.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.bytes_read.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.read_ops.store(0, Ordering::Relaxed);
        self.write_ops.store(0, Ordering::Relaxed);
    }
}

impl Display for FsStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} bytes read, {} bytes written, {} read ops, {} write ops",
            self.bytes_read(),
            self.bytes_written(),
            self.read_ops(),
            self.write_ops()
        )
    }
}
