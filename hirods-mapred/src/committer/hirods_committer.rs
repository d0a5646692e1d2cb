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

use crate::committer::{DefaultOutputCommitter, OutputCommitter};
use crate::context::{JobContext, JobState, TaskAttemptContext};
use hirods_common::conf::{CommitFallback, HirodsConf};
use hirods_common::error::FsError;
use hirods_common::fs::{FileSystem, Path, Reader, Writer};
use hirods_common::{FsResult, FILE_BUFFER_SIZE};
use hirods_ufs::FsFactory;
use log::{debug, error, info, warn};
use std::sync::Arc;

struct Location {
    path: Path,
    fs: Arc<dyn FileSystem>,
}

/// Staged commit of task output into the remote store.
///
/// Each attempt writes into a private work area
/// `<temp>/_temporary/_<attempt>` on the staging filesystem. `commit_task`
/// copies that tree file by file into the output directory, mirroring its
/// relative layout, and deletes each staged file once copied. The copy is not
/// transactional: a failure part way leaves a partially populated output
/// directory, and a retried attempt overwrites whatever it finds there.
///
/// When the output filesystem cannot take staged commits and the fallback
/// policy allows it, every call is forwarded to the host default committer.
pub struct HirodsOutputCommitter {
    output: Option<Location>,
    temp: Option<Location>,
    work_path: Option<Path>,
    buffer_size: usize,
    fallback: Option<DefaultOutputCommitter>,
}

impl HirodsOutputCommitter {
    pub const TEMP_DIR_NAME: &'static str = "_temporary";

    pub fn new(
        output: Option<Path>,
        temp: Option<Path>,
        ctx: &dyn TaskAttemptContext,
        factory: &FsFactory,
        conf: &HirodsConf,
    ) -> FsResult<Self> {
        let mut committer = Self {
            output: None,
            temp: None,
            work_path: None,
            buffer_size: FILE_BUFFER_SIZE,
            fallback: None,
        };

        let output = match output {
            Some(v) => v,
            None => return Ok(committer),
        };

        let out_fs = factory.get(&output)?;
        if conf.commit_fallback == CommitFallback::Capability && !out_fs.supports_staged_commit() {
            info!(
                "{} does not take staged commits, using the default committer",
                output
            );
            let fallback = DefaultOutputCommitter::new(out_fs, output, ctx.task_attempt_id())?;
            committer.work_path = fallback.work_path().cloned();
            committer.fallback = Some(fallback);
            return Ok(committer);
        }

        committer.output = Some(Location {
            path: out_fs.qualify(&output)?,
            fs: out_fs,
        });

        if let Some(temp) = temp {
            let work_fs = factory.get(&temp)?;
            let temp = work_fs.qualify(&temp)?;
            let work_path = temp.join(format!(
                "{}/_{}",
                Self::TEMP_DIR_NAME,
                ctx.task_attempt_id()
            ))?;

            committer.work_path = Some(work_path);
            committer.temp = Some(Location {
                path: temp,
                fs: work_fs,
            });
        }

        Ok(committer)
    }

    /// Whether calls go through the staged protocol rather than the default
    /// committer.
    pub fn is_staged(&self) -> bool {
        self.fallback.is_none()
    }

    pub fn output_path(&self) -> Option<&Path> {
        match &self.fallback {
            Some(f) => Some(f.output_path()),
            None => self.output.as_ref().map(|x| &x.path),
        }
    }

    pub fn temp_path(&self) -> Option<&Path> {
        self.temp.as_ref().map(|x| &x.path)
    }

    fn staged(&self) -> Option<(&Location, &Location, &Path)> {
        match (&self.output, &self.temp, &self.work_path) {
            (Some(out), Some(temp), Some(work)) => Some((out, temp, work)),
            _ => None,
        }
    }

    // Destination of `node` under `out_dir`, mirroring its position below the
    // work path. A node outside the work path is a construction bug.
    fn final_path(out_dir: &Path, node: &Path, work: &Path) -> FsResult<Path> {
        match work.relativize(node) {
            Some(rel) if rel.is_empty() => Ok(out_dir.clone()),
            Some(rel) => out_dir.join(rel),
            None => Err(FsError::invalid_path(
                node.full_path(),
                format!("Can not get the relative path: base = {}", work),
            )),
        }
    }

    fn move_to_final(
        &self,
        ctx: &dyn TaskAttemptContext,
        out: &Location,
        work_fs: &Arc<dyn FileSystem>,
        work: &Path,
        node: &Path,
    ) -> FsResult<()> {
        ctx.progress();
        let final_path = Self::final_path(&out.path, node, work)?;

        if work_fs.is_file(node)? {
            let res = self.copy_file(&out.fs, &final_path, work_fs, node);
            if let Err(e) = work_fs.delete(node, false) {
                warn!("Failed to delete staged file {}: {}", node, e);
            }
            res?;
            debug!("Moved {} to {}", node, final_path);
        } else if work_fs.is_dir(node)? {
            out.fs.mkdirs(&final_path)?;
            for child in work_fs.list_status(node)? {
                let child = Path::new(&child.path)?;
                self.move_to_final(ctx, out, work_fs, work, &child)?;
            }
        }

        Ok(())
    }

    fn copy_file(
        &self,
        out_fs: &Arc<dyn FileSystem>,
        dst: &Path,
        work_fs: &Arc<dyn FileSystem>,
        src: &Path,
    ) -> FsResult<()> {
        let mut writer = out_fs.create(dst, true)?;
        let res = Self::copy_all(work_fs, src, &mut writer, self.buffer_size);
        match res {
            Ok(_) => writer.complete(),
            Err(e) => {
                if let Err(e) = writer.cancel() {
                    warn!("Failed to close {}: {}", dst, e);
                }
                Err(e)
            }
        }
    }

    fn copy_all(
        work_fs: &Arc<dyn FileSystem>,
        src: &Path,
        writer: &mut Box<dyn Writer>,
        buffer_size: usize,
    ) -> FsResult<i64> {
        let mut reader = work_fs.open(src)?;
        let mut buf = vec![0u8; buffer_size];
        let mut total = 0;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            writer.write(&buf[..n])?;
            total += n as i64;
        }

        if let Err(e) = reader.complete() {
            warn!("Failed to close {}: {}", src, e);
        }
        Ok(total)
    }
}

impl OutputCommitter for HirodsOutputCommitter {
    /// Create `<temp>/_temporary`. A failure is logged only: another run of
    /// the same job may already have created it.
    fn setup_job(&self, ctx: &dyn JobContext) -> FsResult<()> {
        if let Some(f) = &self.fallback {
            return f.setup_job(ctx);
        }

        if let (Some(_), Some(temp)) = (&self.output, &self.temp) {
            let tmp = temp.path.join(Self::TEMP_DIR_NAME)?;
            match temp.fs.mkdirs(&tmp) {
                Ok(true) => (),
                Ok(false) => error!("Mkdirs failed to create {}", tmp),
                Err(e) => error!("Mkdirs failed to create {}: {}", tmp, e),
            }
        }
        Ok(())
    }

    /// Task commits already made the output visible; only scratch space is
    /// left to reclaim.
    fn commit_job(&self, ctx: &dyn JobContext) -> FsResult<()> {
        if let Some(f) = &self.fallback {
            return f.commit_job(ctx);
        }
        self.cleanup_job(ctx)
    }

    fn abort_job(&self, ctx: &dyn JobContext, state: JobState) -> FsResult<()> {
        if let Some(f) = &self.fallback {
            return f.abort_job(ctx, state);
        }
        info!("Aborting job {} in state {}", ctx.job_id(), state);
        self.cleanup_job(ctx)
    }

    fn cleanup_job(&self, ctx: &dyn JobContext) -> FsResult<()> {
        if let Some(f) = &self.fallback {
            return f.cleanup_job(ctx);
        }

        match &self.temp {
            Some(temp) => {
                if temp.fs.exists(&temp.path)? {
                    temp.fs.delete(&temp.path, true)?;
                }
            }
            None => warn!("Temp path is absent in cleanup of job {}", ctx.job_id()),
        }
        Ok(())
    }

    fn setup_task(&self, ctx: &dyn TaskAttemptContext) -> FsResult<()> {
        if let Some(f) = &self.fallback {
            return f.setup_task(ctx);
        }
        // The work path is created on demand by the first write.
        Ok(())
    }

    fn needs_task_commit(&self, ctx: &dyn TaskAttemptContext) -> FsResult<bool> {
        if let Some(f) = &self.fallback {
            return f.needs_task_commit(ctx);
        }

        let (_, temp, work) = match self.staged() {
            Some(v) => v,
            None => return Ok(false),
        };

        if temp.fs.is_file(work)? {
            return Ok(true);
        }
        if temp.fs.is_dir(work)? {
            return Ok(!temp.fs.list_status(work)?.is_empty());
        }
        Ok(false)
    }

    fn commit_task(&self, ctx: &dyn TaskAttemptContext) -> FsResult<()> {
        if let Some(f) = &self.fallback {
            return f.commit_task(ctx);
        }

        let (out, temp, work) = match self.staged() {
            Some(v) => v,
            None => return Ok(()),
        };

        ctx.progress();
        if !temp.fs.exists(work)? {
            return Ok(());
        }

        self.move_to_final(ctx, out, &temp.fs, work, work)?;
        match temp.fs.delete(work, true) {
            Ok(true) => (),
            Ok(false) => warn!(
                "Failed to delete the temporary output directory of task: {} - {}",
                ctx.task_attempt_id(),
                work
            ),
            Err(e) => warn!(
                "Failed to delete the temporary output directory of task: {} - {}: {}",
                ctx.task_attempt_id(),
                work,
                e
            ),
        }

        info!(
            "Saved output of task '{}' to {}",
            ctx.task_attempt_id(),
            out.path
        );
        Ok(())
    }

    /// Delete the work area. Never fails: errors are logged.
    fn abort_task(&self, ctx: &dyn TaskAttemptContext) -> FsResult<()> {
        if let Some(f) = &self.fallback {
            return f.abort_task(ctx);
        }

        if let (Some(temp), Some(work)) = (&self.temp, &self.work_path) {
            ctx.progress();
            if let Err(e) = temp.fs.delete(work, true) {
                warn!(
                    "Error discarding output of {}: {}",
                    ctx.task_attempt_id(),
                    e
                );
            }
        }
        Ok(())
    }

    fn work_path(&self) -> Option<&Path> {
        self.work_path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_path() {
        let work = Path::new("/tmp/job-stage/_temporary/_attempt_1").unwrap();
        let out = Path::new("irods://host:1247/zone/home/u/out").unwrap();

        let node = work.join("sub/part-m-00000").unwrap();
        let dst = HirodsOutputCommitter::final_path(&out, &node, &work).unwrap();
        assert_eq!(dst, out.join("sub/part-m-00000").unwrap());
        assert_eq!(HirodsOutputCommitter::final_path(&out, &work, &work).unwrap(), out);

        let outside = Path::new("/tmp/job-stage/_temporary/_attempt_10/x").unwrap();
        let err = HirodsOutputCommitter::final_path(&out, &outside, &work).unwrap_err();
        assert!(matches!(err, FsError::InvalidPath(_)), "{:?}", err);
    }
}
