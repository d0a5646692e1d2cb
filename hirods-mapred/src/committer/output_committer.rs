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

use crate::context::{JobContext, JobState, TaskAttemptContext};
use hirods_common::fs::Path;
use hirods_common::FsResult;

/// Job and task lifecycle hooks through which the host framework makes task
/// output visible.
///
/// One committer is built per task attempt. The framework calls
/// `commit_task` only after every stream the attempt wrote has been closed,
/// and never commits two attempts of the same task.
pub trait OutputCommitter: Send + Sync {
    fn setup_job(&self, ctx: &dyn JobContext) -> FsResult<()>;

    fn commit_job(&self, ctx: &dyn JobContext) -> FsResult<()>;

    fn abort_job(&self, ctx: &dyn JobContext, state: JobState) -> FsResult<()>;

    fn cleanup_job(&self, ctx: &dyn JobContext) -> FsResult<()>;

    fn setup_task(&self, ctx: &dyn TaskAttemptContext) -> FsResult<()>;

    fn needs_task_commit(&self, ctx: &dyn TaskAttemptContext) -> FsResult<bool>;

    fn commit_task(&self, ctx: &dyn TaskAttemptContext) -> FsResult<()>;

    fn abort_task(&self, ctx: &dyn TaskAttemptContext) -> FsResult<()>;

    /// Where the attempt writes its output.
    fn work_path(&self) -> Option<&Path>;
}
