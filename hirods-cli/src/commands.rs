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

use clap::Subcommand;
use hirods_common::conf::HirodsConf;
use hirods_common::fs::{FileSystem, Path, Reader, Writer};
use hirods_common::utils::LocalTime;
use hirods_common::{FsResult, FILE_BUFFER_SIZE};
use hirods_mapred::committer::{HirodsOutputCommitter, OutputCommitter};
use hirods_mapred::context::{JobId, JobState, TaskAttemptId, TaskContext, TaskId, TaskType};
use hirods_ufs::FsFactory;
use std::collections::HashMap;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a remote file to stdout
    Cat { path: String },

    /// Upload a local file
    Put {
        local: String,
        remote: String,
        #[arg(short, long)]
        overwrite: bool,
    },

    /// List a remote directory
    Ls { path: Option<String> },

    /// Copy an attempt's staged output into the output directory
    CommitTask {
        #[command(flatten)]
        task: TaskArgs,
    },

    /// Discard an attempt's staged output
    AbortTask {
        #[command(flatten)]
        task: TaskArgs,
    },

    /// Remove a job's staging area
    CleanupJob {
        #[arg(long)]
        output: String,
        #[arg(long)]
        temp: Option<String>,
        #[arg(long)]
        job: String,
        /// Report the job as failed instead of succeeded
        #[arg(long)]
        failed: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct TaskArgs {
    /// Output directory; irods:// paths take the staged protocol
    #[arg(long)]
    output: String,

    /// Local staging root, defaults to fs.irods.output.buffered.path
    #[arg(long)]
    temp: Option<String>,

    /// e.g. attempt_201401011200_0001_m_000003_0
    #[arg(long)]
    attempt: String,
}

impl Commands {
    pub fn execute(self, factory: &FsFactory, conf: &HirodsConf) -> FsResult<()> {
        match self {
            Commands::Cat { path } => cat(factory, &path),
            Commands::Put {
                local,
                remote,
                overwrite,
            } => put(factory, &local, &remote, overwrite),
            Commands::Ls { path } => ls(factory, path.as_deref().unwrap_or(".")),

            Commands::CommitTask { task } => {
                let (ctx, committer) = task.committer(factory, conf)?;
                if committer.needs_task_commit(&ctx)? {
                    committer.commit_task(&ctx)?;
                } else {
                    println!("Nothing to commit for {}", task.attempt);
                }
                Ok(())
            }

            Commands::AbortTask { task } => {
                let (ctx, committer) = task.committer(factory, conf)?;
                committer.abort_task(&ctx)
            }

            Commands::CleanupJob {
                output,
                temp,
                job,
                failed,
            } => {
                let job: JobId = job.parse()?;
                let attempt = TaskAttemptId::new(TaskId::new(job, TaskType::Map, 0), 0);
                let task = TaskArgs {
                    output,
                    temp,
                    attempt: attempt.to_string(),
                };
                let (ctx, committer) = task.committer(factory, conf)?;
                let job_ctx = ctx.job_context();
                if failed {
                    committer.abort_job(&job_ctx, JobState::Failed)
                } else {
                    committer.commit_job(&job_ctx)
                }
            }
        }
    }
}

impl TaskArgs {
    fn committer(
        &self,
        factory: &FsFactory,
        conf: &HirodsConf,
    ) -> FsResult<(TaskContext, HirodsOutputCommitter)> {
        let attempt: TaskAttemptId = self.attempt.parse()?;
        let ctx = TaskContext::new(attempt, HashMap::new());

        let output = Path::new(&self.output)?;
        let temp = match &self.temp {
            Some(v) => Path::new(v)?,
            None => Path::new(&conf.output_buffered_path)?,
        };
        let committer = HirodsOutputCommitter::new(Some(output), Some(temp), &ctx, factory, conf)?;
        Ok((ctx, committer))
    }
}

fn cat(factory: &FsFactory, path: &str) -> FsResult<()> {
    use std::io::Write;

    let fs = factory.remote()?;
    let mut reader = fs.open(&Path::new(path)?)?;
    let mut buf = vec![0u8; FILE_BUFFER_SIZE];
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
    }
    out.flush()?;
    reader.complete()
}

fn put(factory: &FsFactory, local: &str, remote: &str, overwrite: bool) -> FsResult<()> {
    let src = Path::new(local)?;
    let dst = Path::new(remote)?;
    let mut reader = factory.local().open(&src)?;
    let mut writer = factory.remote()?.create(&dst, overwrite)?;

    let mut buf = vec![0u8; FILE_BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write(&buf[..n])?;
    }
    writer.complete()?;
    reader.complete()?;
    println!("Put {} bytes to {}", writer.pos(), dst);
    Ok(())
}

fn ls(factory: &FsFactory, path: &str) -> FsResult<()> {
    let fs = factory.remote()?;
    let mut list = fs.list_status(&Path::new(path)?)?;
    list.sort_by(|a, b| a.name.cmp(&b.name));

    for status in list {
        let kind = if status.is_dir { "d" } else { "-" };
        println!(
            "{} {:>12} {} {}",
            kind,
            status.len,
            LocalTime::format_mills(status.mtime),
            status.path
        );
    }
    Ok(())
}
