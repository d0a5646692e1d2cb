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

use crate::committer::OutputCommitter;
use crate::context::{JobContext, JobState, TaskAttemptContext, TaskAttemptId};
use hirods_common::fs::{FileSystem, Path, Writer};
use hirods_common::{err_box, FsResult};
use log::{info, warn};
use std::sync::Arc;

/// The host framework's own committer: attempts write under
/// `<out>/_temporary/_<attempt>` on the output filesystem and commit by
/// renaming their files into `<out>`.
pub struct DefaultOutputCommitter {
    fs: Arc<dyn FileSystem>,
    output: Path,
    work_path: Path,
}

impl DefaultOutputCommitter {
    pub const TEMP_DIR_NAME: &'static str = "_temporary";
    pub const SUCCEEDED_FILE_NAME: &'static str = "_SUCCESS";

    pub fn new(fs: Arc<dyn FileSystem>, output: Path, attempt: &TaskAttemptId) -> FsResult<Self> {
        let output = fs.qualify(&output)?;
        let work_path = output.join(format!("{}/_{}", Self::TEMP_DIR_NAME, attempt))?;
        Ok(Self {
            fs,
            output,
            work_path,
        })
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    fn temp_dir(&self) -> FsResult<Path> {
        self.output.join(Self::TEMP_DIR_NAME)
    }

    // Rename `src` to `dst`, merging into an existing directory and replacing
    // an existing file.
    fn merge(&self, src: &Path, dst: &Path) -> FsResult<()> {
        let status = self.fs.get_status(src)?;
        if status.is_file() {
            if self.fs.exists(dst)? {
                self.fs.delete(dst, true)?;
            }
            if !self.fs.rename(src, dst)? {
                return err_box!("Failed to rename {} to {}", src, dst);
            }
            return Ok(());
        }

        if !self.fs.is_dir(dst)? {
            if self.fs.exists(dst)? {
                self.fs.delete(dst, false)?;
            }
            if !self.fs.rename(src, dst)? {
                return err_box!("Failed to rename {} to {}", src, dst);
            }
            return Ok(());
        }

        for child in self.fs.list_status(src)? {
            let child = Path::new(&child.path)?;
            let target = dst.join(child.name())?;
            self.merge(&child, &target)?;
        }
        Ok(())
    }
}

impl OutputCommitter for DefaultOutputCommitter {
    fn setup_job(&self, _: &dyn JobContext) -> FsResult<()> {
        let tmp = self.temp_dir()?;
        if !self.fs.mkdirs(&tmp)? {
            warn!("Mkdirs failed to create {}", tmp);
        }
        Ok(())
    }

    fn commit_job(&self, ctx: &dyn JobContext) -> FsResult<()> {
        self.cleanup_job(ctx)?;
        let marker = self.output.join(Self::SUCCEEDED_FILE_NAME)?;
        self.fs.create(&marker, true)?.complete()
    }

    fn abort_job(&self, ctx: &dyn JobContext, _: JobState) -> FsResult<()> {
        self.cleanup_job(ctx)
    }

    fn cleanup_job(&self, _: &dyn JobContext) -> FsResult<()> {
        let tmp = self.temp_dir()?;
        if self.fs.exists(&tmp)? {
            self.fs.delete(&tmp, true)?;
        }
        Ok(())
    }

    fn setup_task(&self, _: &dyn TaskAttemptContext) -> FsResult<()> {
        Ok(())
    }

    fn needs_task_commit(&self, _: &dyn TaskAttemptContext) -> FsResult<bool> {
        self.fs.exists(&self.work_path)
    }

    fn commit_task(&self, ctx: &dyn TaskAttemptContext) -> FsResult<()> {
        if !self.fs.exists(&self.work_path)? {
            return Ok(());
        }

        ctx.progress();
        self.fs.mkdirs(&self.output)?;
        for child in self.fs.list_status(&self.work_path)? {
            let child = Path::new(&child.path)?;
            let target = self.output.join(child.name())?;
            self.merge(&child, &target)?;
        }

        if !self.fs.delete(&self.work_path, true)? {
            warn!("Failed to delete the temporary output directory {}", self.work_path);
        }
        info!(
            "Saved output of task '{}' to {}",
            ctx.task_attempt_id(),
            self.output
        );
        Ok(())
    }

    fn abort_task(&self, ctx: &dyn TaskAttemptContext) -> FsResult<()> {
        ctx.progress();
        if let Err(e) = self.fs.delete(&self.work_path, true) {
            warn!("Error discarding output of {}: {}", ctx.task_attempt_id(), e);
        }
        Ok(())
    }

    fn work_path(&self) -> Option<&Path> {
        Some(&self.work_path)
    }
}
