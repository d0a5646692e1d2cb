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

use hirods_common::error::FsError;
use hirods_common::{err_ufs, FsResult};
use hirods_ufs::irods::{IrodsAccount, RandomAccessFile, RemoteOutput, RemoteSession, RemoteStat};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MemState {
    fn has_children(&self, dir: &str) -> bool {
        let prefix = child_prefix(dir);
        self.files.keys().any(|x| x.starts_with(&prefix))
            || self.dirs.iter().any(|x| x.starts_with(&prefix))
    }
}

/// Call counters of a [`MemSession`], shared with the handles it opens.
#[derive(Default)]
pub struct Counters {
    reads: AtomicU64,
    seeks: AtomicU64,
    opens: AtomicU64,
    outputs: AtomicU64,
    read_log: Mutex<Vec<(i64, usize)>>,
}

impl Counters {
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn seeks(&self) -> u64 {
        self.seeks.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn outputs(&self) -> u64 {
        self.outputs.load(Ordering::SeqCst)
    }

    /// `(position, requested length)` of every remote read, in order.
    pub fn read_log(&self) -> Vec<(i64, usize)> {
        match self.read_log.lock() {
            Ok(v) => v.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    pub fn reset(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.seeks.store(0, Ordering::SeqCst);
        self.opens.store(0, Ordering::SeqCst);
        self.outputs.store(0, Ordering::SeqCst);
        if let Ok(mut v) = self.read_log.lock() {
            v.clear();
        }
    }
}

fn child_prefix(dir: &str) -> String {
    if dir == "/" {
        "/".to_string()
    } else {
        format!("{}/", dir)
    }
}

fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

/// A remote store held in memory. Every handle call is counted so tests can
/// assert how many round trips an operation costs.
pub struct MemSession {
    account: IrodsAccount,
    state: Arc<Mutex<MemState>>,
    counters: Arc<Counters>,
    max_read: Arc<AtomicUsize>,
    fail_output: Arc<AtomicBool>,
    // Outputs that may still be opened; u64::MAX is unlimited.
    output_budget: AtomicU64,
}

impl MemSession {
    pub fn new(account: IrodsAccount) -> Self {
        let session = Self {
            account,
            state: Arc::new(Mutex::new(MemState::default())),
            counters: Arc::new(Counters::default()),
            max_read: Arc::new(AtomicUsize::new(0)),
            fail_output: Arc::new(AtomicBool::new(false)),
            output_budget: AtomicU64::new(u64::MAX),
        };

        if let Ok(mut state) = session.state.lock() {
            state.dirs.insert("/".to_string());
            Self::insert_dirs(&mut state, &session.account.home_directory);
        }
        session
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    /// Cap the bytes one remote read returns; 0 removes the cap.
    pub fn set_max_read(&self, n: usize) {
        self.max_read.store(n, Ordering::SeqCst);
    }

    /// Make every write to an output handle fail.
    pub fn set_fail_output(&self, fail: bool) {
        self.fail_output.store(fail, Ordering::SeqCst);
    }

    /// Let only the next `n` outputs open; later opens fail. `None` lifts
    /// the limit.
    pub fn set_output_budget(&self, n: Option<u64>) {
        self.output_budget
            .store(n.unwrap_or(u64::MAX), Ordering::SeqCst);
    }

    /// Store `data` at `path`, creating the parent directories.
    pub fn put(&self, path: &str, data: &[u8]) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(parent) = parent_of(path) {
                Self::insert_dirs(&mut state, parent);
            }
            state.files.insert(path.to_string(), data.to_vec());
        }
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().ok()?.files.get(path).cloned()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        match self.state.lock() {
            Ok(state) => state.dirs.contains(path),
            Err(_) => false,
        }
    }

    /// All file paths below `dir`.
    pub fn files_under(&self, dir: &str) -> Vec<String> {
        let prefix = child_prefix(dir);
        match self.state.lock() {
            Ok(state) => state
                .files
                .keys()
                .filter(|x| x.starts_with(&prefix))
                .cloned()
                .collect(),
            Err(_) => vec![],
        }
    }

    fn lock(&self) -> FsResult<MutexGuard<'_, MemState>> {
        self.state
            .lock()
            .map_err(|e| FsError::common(format!("Lock poisoned: {}", e)))
    }

    fn insert_dirs(state: &mut MemState, path: &str) {
        let mut cur = Some(path);
        while let Some(p) = cur {
            if !state.dirs.insert(p.to_string()) {
                break;
            }
            cur = parent_of(p);
        }
    }
}

impl RemoteSession for MemSession {
    fn account(&self) -> &IrodsAccount {
        &self.account
    }

    fn stat(&self, path: &str) -> FsResult<Option<RemoteStat>> {
        let state = self.lock()?;
        if state.dirs.contains(path) {
            return Ok(Some(RemoteStat {
                is_dir: true,
                len: 0,
                mtime: 0,
            }));
        }
        Ok(state.files.get(path).map(|x| RemoteStat {
            is_dir: false,
            len: x.len() as i64,
            mtime: 0,
        }))
    }

    fn list(&self, path: &str) -> FsResult<Vec<String>> {
        let state = self.lock()?;
        if !state.dirs.contains(path) {
            return Err(FsError::file_not_found(path));
        }

        let prefix = child_prefix(path);
        let direct = |x: &String| {
            x.strip_prefix(&prefix)
                .filter(|rest| !rest.is_empty() && !rest.contains('/'))
                .map(|rest| rest.to_string())
        };
        let mut names: Vec<String> = state.dirs.iter().filter_map(direct).collect();
        names.extend(state.files.keys().filter_map(direct));
        Ok(names)
    }

    fn mkdirs(&self, path: &str) -> FsResult<bool> {
        let mut state = self.lock()?;
        let mut cur = Some(path);
        while let Some(p) = cur {
            if state.files.contains_key(p) {
                return err_ufs!("Can not create {}: {} is a file", path, p);
            }
            cur = parent_of(p);
        }
        Self::insert_dirs(&mut state, path);
        Ok(true)
    }

    fn delete(&self, path: &str) -> FsResult<bool> {
        let mut state = self.lock()?;
        if state.files.remove(path).is_some() {
            return Ok(true);
        }
        if !state.dirs.contains(path) {
            return Ok(false);
        }
        if state.has_children(path) {
            return err_ufs!("Directory {} is not empty", path);
        }
        state.dirs.remove(path);
        Ok(true)
    }

    fn rename(&self, src: &str, dst: &str) -> FsResult<bool> {
        let mut state = self.lock()?;
        let exists = |s: &MemState, p: &str| s.files.contains_key(p) || s.dirs.contains(p);
        if !exists(&*state, src) || exists(&*state, dst) {
            return Ok(false);
        }

        if let Some(data) = state.files.remove(src) {
            state.files.insert(dst.to_string(), data);
            return Ok(true);
        }

        let prefix = child_prefix(src);
        let moved = |p: &str| format!("{}{}", dst, &p[src.len()..]);
        let dirs: Vec<String> = state
            .dirs
            .iter()
            .filter(|x| x.as_str() == src || x.starts_with(&prefix))
            .cloned()
            .collect();
        for d in dirs {
            state.dirs.remove(&d);
            state.dirs.insert(moved(d.as_str()));
        }
        let files: Vec<String> = state
            .files
            .keys()
            .filter(|x| x.starts_with(&prefix))
            .cloned()
            .collect();
        for f in files {
            if let Some(data) = state.files.remove(&f) {
                state.files.insert(moved(f.as_str()), data);
            }
        }
        Ok(true)
    }

    fn open_random_access(&self, path: &str) -> FsResult<Box<dyn RandomAccessFile>> {
        if !self.lock()?.files.contains_key(path) {
            return Err(FsError::file_not_found(path));
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemRandomAccess {
            path: path.to_string(),
            state: self.state.clone(),
            counters: self.counters.clone(),
            max_read: self.max_read.clone(),
            pos: 0,
            closed: false,
        }))
    }

    fn open_output(&self, path: &str) -> FsResult<Box<dyn RemoteOutput>> {
        let mut state = self.lock()?;
        match parent_of(path) {
            Some(p) if state.dirs.contains(p) => (),
            _ => return err_ufs!("Parent of {} does not exist", path),
        }
        if state.dirs.contains(path) {
            return err_ufs!("{} is a directory", path);
        }

        let budget = self.output_budget.load(Ordering::SeqCst);
        if budget == 0 {
            return err_ufs!("Injected open failure on {}", path);
        } else if budget != u64::MAX {
            self.output_budget.store(budget - 1, Ordering::SeqCst);
        }

        state.files.insert(path.to_string(), vec![]);
        self.counters.outputs.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemOutput {
            path: path.to_string(),
            state: self.state.clone(),
            fail: self.fail_output.clone(),
            closed: false,
        }))
    }

    fn close(&self) -> FsResult<()> {
        Ok(())
    }
}

struct MemRandomAccess {
    path: String,
    state: Arc<Mutex<MemState>>,
    counters: Arc<Counters>,
    max_read: Arc<AtomicUsize>,
    pos: i64,
    closed: bool,
}

impl MemRandomAccess {
    fn check_open(&self) -> FsResult<()> {
        if self.closed {
            Err(FsError::stream_closed(self.path.as_str()))
        } else {
            Ok(())
        }
    }
}

impl RandomAccessFile for MemRandomAccess {
    fn length(&self) -> FsResult<i64> {
        let state = self
            .state
            .lock()
            .map_err(|e| FsError::common(format!("Lock poisoned: {}", e)))?;
        match state.files.get(&self.path) {
            Some(v) => Ok(v.len() as i64),
            None => Err(FsError::file_not_found(self.path.as_str())),
        }
    }

    fn seek(&mut self, pos: i64) -> FsResult<()> {
        self.check_open()?;
        self.counters.seeks.fetch_add(1, Ordering::SeqCst);
        self.pos = pos;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> FsResult<usize> {
        self.check_open()?;
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.counters.read_log.lock() {
            log.push((self.pos, buf.len()));
        }

        let state = self
            .state
            .lock()
            .map_err(|e| FsError::common(format!("Lock poisoned: {}", e)))?;
        let data = match state.files.get(&self.path) {
            Some(v) => v,
            None => return Err(FsError::file_not_found(self.path.as_str())),
        };

        let start = (self.pos.max(0) as usize).min(data.len());
        let mut n = buf.len().min(data.len() - start);
        let cap = self.max_read.load(Ordering::SeqCst);
        if cap > 0 {
            n = n.min(cap);
        }
        buf[..n].copy_from_slice(&data[start..start + n]);
        self.pos += n as i64;
        Ok(n)
    }

    fn close(&mut self) -> FsResult<()> {
        self.closed = true;
        Ok(())
    }
}

struct MemOutput {
    path: String,
    state: Arc<Mutex<MemState>>,
    fail: Arc<AtomicBool>,
    closed: bool,
}

impl RemoteOutput for MemOutput {
    fn write(&mut self, buf: &[u8]) -> FsResult<()> {
        if self.closed {
            return Err(FsError::stream_closed(self.path.as_str()));
        }
        if self.fail.load(Ordering::SeqCst) {
            return err_ufs!("Injected write failure on {}", self.path);
        }

        let mut state = self
            .state
            .lock()
            .map_err(|e| FsError::common(format!("Lock poisoned: {}", e)))?;
        state
            .files
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> FsResult<()> {
        Ok(())
    }

    fn close(&mut self) -> FsResult<()> {
        self.closed = true;
        Ok(())
    }
}
