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

use crate::conf::LogConf;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

// Keeps the background file writer alive for the life of the process.
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

pub struct Logger;

impl Logger {
    /// Install the global subscriber and route `log` records through it.
    /// Only the first call in a process takes effect.
    pub fn init(conf: LogConf) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(conf.level.as_str()));

        let (writer, guard) = if conf.log_dir.is_empty() {
            (BoxMakeWriter::new(std::io::stdout), None)
        } else {
            let appender = tracing_appender::rolling::daily(&conf.log_dir, &conf.file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        };

        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(conf.display_target)
            .with_thread_names(conf.display_thread);

        let subscriber = Registry::default().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            return;
        }

        let _ = tracing_log::LogTracer::init();
        if let Some(guard) = guard {
            let _ = FILE_GUARD.set(guard);
        }
    }

    /// Console logger for tests, filtered by RUST_LOG.
    pub fn default() {
        Self::init(LogConf::default())
    }
}
