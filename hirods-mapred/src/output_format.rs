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

use crate::committer::{HirodsOutputCommitter, OutputCommitter};
use crate::context::TaskAttemptContext;
use hirods_common::conf::HirodsConf;
use hirods_common::error::FsError;
use hirods_common::fs::{Path, Writer};
use hirods_common::FsResult;
use hirods_ufs::FsFactory;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, Mutex};

/// Output format whose tasks write into a local work area and commit through
/// [`HirodsOutputCommitter`].
pub struct HirodsOutputFormat {
    factory: FsFactory,
    committer: Mutex<Option<Arc<HirodsOutputCommitter>>>,
}

impl HirodsOutputFormat {
    pub const OUTPUT_DIR: &'static str = "mapreduce.output.fileoutputformat.outputdir";
    pub const BASE_OUTPUT_NAME: &'static str = "mapreduce.output.basename";
    pub const DEFAULT_OUTPUT_NAME: &'static str = "part";

    pub fn new(factory: FsFactory) -> Self {
        Self {
            factory,
            committer: Mutex::new(None),
        }
    }

    pub fn set_output_path(conf: &mut HashMap<String, String>, path: &Path) {
        conf.insert(Self::OUTPUT_DIR.to_string(), path.full_path());
    }

    /// Root of the local staging area the work paths are created under.
    pub fn set_temp_path(conf: &mut HashMap<String, String>, path: &Path) {
        conf.insert(HirodsConf::OUTPUT_BUFFERED_PATH.to_string(), path.full_path());
    }

    pub fn output_path(conf: &HashMap<String, String>) -> FsResult<Option<Path>> {
        match conf.get(Self::OUTPUT_DIR) {
            Some(v) if !v.is_empty() => Ok(Some(Path::new(v)?)),
            _ => Ok(None),
        }
    }

    /// The committer of this attempt, built on first use.
    pub fn output_committer(
        &self,
        ctx: &dyn TaskAttemptContext,
    ) -> FsResult<Arc<HirodsOutputCommitter>> {
        let mut guard = self
            .committer
            .lock()
            .map_err(|e| FsError::common(format!("Lock poisoned: {}", e)))?;

        if let Some(v) = guard.as_ref() {
            return Ok(v.clone());
        }

        let conf = HirodsConf::with_map(ctx.configuration())?;
        let output = Self::output_path(ctx.configuration())?;
        let temp = Path::new(&conf.output_buffered_path)?;
        let committer = Arc::new(HirodsOutputCommitter::new(
            output,
            Some(temp),
            ctx,
            &self.factory,
            &conf,
        )?);

        *guard = Some(committer.clone());
        Ok(committer)
    }

    /// `<name>-<m|r>-<task:05><extension>`
    pub fn unique_file(ctx: &dyn TaskAttemptContext, name: &str, extension: &str) -> String {
        let attempt = ctx.task_attempt_id();
        format!(
            "{}-{}-{:05}{}",
            name,
            attempt.task_type().as_char(),
            attempt.task.id,
            extension
        )
    }

    pub fn default_work_file(&self, ctx: &dyn TaskAttemptContext, extension: &str) -> FsResult<Path> {
        let committer = self.output_committer(ctx)?;
        let work = match committer.work_path() {
            Some(v) => v,
            None => return Err(FsError::conf("Output path is not set for this job")),
        };

        let name = ctx
            .configuration()
            .get(Self::BASE_OUTPUT_NAME)
            .map(|x| x.as_str())
            .unwrap_or(Self::DEFAULT_OUTPUT_NAME);
        work.join(Self::unique_file(ctx, name, extension))
    }

    pub fn record_writer(
        &self,
        ctx: &dyn TaskAttemptContext,
        extension: &str,
    ) -> FsResult<TextRecordWriter> {
        let file = self.default_work_file(ctx, extension)?;
        let fs = self.factory.get(&file)?;
        let writer = fs.create(&file, false)?;
        Ok(TextRecordWriter::new(writer))
    }
}

/// Writes `key<TAB>value\n` lines. An absent key or value drops the separator.
pub struct TextRecordWriter {
    out: Box<dyn Writer>,
    separator: String,
}

impl TextRecordWriter {
    pub const SEPARATOR: &'static str = "\t";

    pub fn new(out: Box<dyn Writer>) -> Self {
        Self::with_separator(out, Self::SEPARATOR)
    }

    pub fn with_separator(out: Box<dyn Writer>, separator: impl Into<String>) -> Self {
        Self {
            out,
            separator: separator.into(),
        }
    }

    pub fn path(&self) -> &Path {
        self.out.path()
    }

    pub fn write<K: Display, V: Display>(&mut self, key: Option<K>, value: Option<V>) -> FsResult<()> {
        let line = match (key, value) {
            (Some(k), Some(v)) => format!("{}{}{}\n", k, self.separator, v),
            (Some(k), None) => format!("{}\n", k),
            (None, Some(v)) => format!("{}\n", v),
            (None, None) => return Ok(()),
        };
        self.out.write(line.as_bytes())
    }

    pub fn close(mut self) -> FsResult<()> {
        self.out.complete()
    }
}
