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

use crate::context::{JobId, TaskAttemptId};
use hirods_common::utils::LocalTime;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Liveness heartbeat towards the scheduler.
pub trait Progressable {
    fn progress(&self);
}

pub trait JobContext {
    fn job_id(&self) -> &JobId;

    /// The job's key/value configuration.
    fn configuration(&self) -> &HashMap<String, String>;
}

pub trait TaskAttemptContext: JobContext + Progressable {
    fn task_attempt_id(&self) -> &TaskAttemptId;
}

/// Final run state reported to `abort_job`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Succeeded,
    Failed,
    Killed,
}

impl Display for JobState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Succeeded => "SUCCEEDED",
            JobState::Failed => "FAILED",
            JobState::Killed => "KILLED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct JobContextImpl {
    job_id: JobId,
    conf: HashMap<String, String>,
}

impl JobContextImpl {
    pub fn new(job_id: JobId, conf: HashMap<String, String>) -> Self {
        Self { job_id, conf }
    }
}

impl JobContext for JobContextImpl {
    fn job_id(&self) -> &JobId {
        &self.job_id
    }

    fn configuration(&self) -> &HashMap<String, String> {
        &self.conf
    }
}

/// Context of one task attempt. Counts heartbeats and remembers when the last
/// one arrived.
#[derive(Debug)]
pub struct TaskContext {
    attempt_id: TaskAttemptId,
    conf: HashMap<String, String>,
    heartbeats: AtomicU64,
    last_progress: AtomicI64,
}

impl TaskContext {
    pub fn new(attempt_id: TaskAttemptId, conf: HashMap<String, String>) -> Self {
        Self {
            attempt_id,
            conf,
            heartbeats: AtomicU64::new(0),
            last_progress: AtomicI64::new(LocalTime::mills()),
        }
    }

    pub fn heartbeats(&self) -> u64 {
        self.heartbeats.load(Ordering::Relaxed)
    }

    pub fn last_progress(&self) -> i64 {
        self.last_progress.load(Ordering::Relaxed)
    }

    pub fn job_context(&self) -> JobContextImpl {
        JobContextImpl::new(self.attempt_id.job_id().clone(), self.conf.clone())
    }
}

impl Progressable for TaskContext {
    fn progress(&self) {
        self.heartbeats.fetch_add(1, Ordering::Relaxed);
        self.last_progress
            .store(LocalTime::mills(), Ordering::Relaxed);
    }
}

impl JobContext for TaskContext {
    fn job_id(&self) -> &JobId {
        self.attempt_id.job_id()
    }

    fn configuration(&self) -> &HashMap<String, String> {
        &self.conf
    }
}

impl TaskAttemptContext for TaskContext {
    fn task_attempt_id(&self) -> &TaskAttemptId {
        &self.attempt_id
    }
}
