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
use std::fmt::{Display, Formatter};
use std::str::FromStr;

fn parse_num(s: &str, what: &str, full: &str) -> Result<u32, FsError> {
    s.parse::<u32>()
        .map_err(|_| FsError::common(format!("Invalid {} in {}", what, full)))
}

/// `job_<cluster>_<n>`, where `n` is printed with at least 4 digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId {
    pub cluster: String,
    pub id: u32,
}

impl JobId {
    pub const PREFIX: &'static str = "job";

    pub fn new(cluster: impl Into<String>, id: u32) -> Self {
        Self {
            cluster: cluster.into(),
            id,
        }
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{:04}", Self::PREFIX, self.cluster, self.id)
    }
}

impl FromStr for JobId {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        match parts.as_slice() {
            [Self::PREFIX, cluster, id] if !cluster.is_empty() => {
                Ok(Self::new(*cluster, parse_num(id, "job id", s)?))
            }
            _ => Err(FsError::common(format!("Invalid job id {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskType {
    Map,
    Reduce,
}

impl TaskType {
    pub fn as_char(&self) -> char {
        match self {
            TaskType::Map => 'm',
            TaskType::Reduce => 'r',
        }
    }
}

impl FromStr for TaskType {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(TaskType::Map),
            "r" => Ok(TaskType::Reduce),
            _ => Err(FsError::common(format!("Invalid task type {}", s))),
        }
    }
}

/// `task_<cluster>_<job>_<m|r>_<task>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub job: JobId,
    pub task_type: TaskType,
    pub id: u32,
}

impl TaskId {
    pub const PREFIX: &'static str = "task";

    pub fn new(job: JobId, task_type: TaskType, id: u32) -> Self {
        Self { job, task_type, id }
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}_{:04}_{}_{:06}",
            Self::PREFIX,
            self.job.cluster,
            self.job.id,
            self.task_type.as_char(),
            self.id
        )
    }
}

/// `attempt_<cluster>_<job>_<m|r>_<task>_<attempt>`, unique per execution of
/// a task. Work areas are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskAttemptId {
    pub task: TaskId,
    pub id: u32,
}

impl TaskAttemptId {
    pub const PREFIX: &'static str = "attempt";

    pub fn new(task: TaskId, id: u32) -> Self {
        Self { task, id }
    }

    pub fn job_id(&self) -> &JobId {
        &self.task.job
    }

    pub fn task_type(&self) -> TaskType {
        self.task.task_type
    }
}

impl Display for TaskAttemptId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}_{}_{:04}_{}_{:06}_{}",
            Self::PREFIX,
            self.task.job.cluster,
            self.task.job.id,
            self.task.task_type.as_char(),
            self.task.id,
            self.id
        )
    }
}

impl FromStr for TaskAttemptId {
    type Err = FsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        match parts.as_slice() {
            [Self::PREFIX, cluster, job, task_type, task, attempt] if !cluster.is_empty() => {
                let job = JobId::new(*cluster, parse_num(job, "job id", s)?);
                let task = TaskId::new(job, task_type.parse()?, parse_num(task, "task id", s)?);
                Ok(Self::new(task, parse_num(attempt, "attempt id", s)?))
            }
            _ => Err(FsError::common(format!("Invalid task attempt id {}", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_id() {
        let id: TaskAttemptId = "attempt_201401011200_0007_m_000003_1".parse().unwrap();
        assert_eq!(id.job_id(), &JobId::new("201401011200", 7));
        assert_eq!(id.task_type(), TaskType::Map);
        assert_eq!(id.task.id, 3);
        assert_eq!(id.id, 1);
        assert_eq!(id.to_string(), "attempt_201401011200_0007_m_000003_1");
        assert_eq!(id.task.to_string(), "task_201401011200_0007_m_000003");

        assert!("attempt_x_1_q_1_1".parse::<TaskAttemptId>().is_err());
        assert!("task_x_1_m_1".parse::<TaskAttemptId>().is_err());
        assert!("attempt__1_m_1_1".parse::<TaskAttemptId>().is_err());
    }

    #[test]
    fn job_id() {
        let id: JobId = "job_local_0001".parse().unwrap();
        assert_eq!(id, JobId::new("local", 1));
        assert_eq!(JobId::new("local", 12345).to_string(), "job_local_12345");
        assert!("job_local".parse::<JobId>().is_err());
    }
}
