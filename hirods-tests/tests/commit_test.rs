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

use hirods_common::conf::CommitFallback;
use hirods_common::fs::{FileSystem, Path, Writer};
use hirods_mapred::committer::{HirodsOutputCommitter, OutputCommitter};
use hirods_mapred::context::{JobState, TaskAttemptId, TaskContext};
use hirods_mapred::HirodsOutputFormat;
use hirods_tests::Testing;
use hirods_ufs::FsFactory;
use std::collections::HashMap;

const ATTEMPT_A: &str = "attempt_201401011200_0001_m_000003_0";
const ATTEMPT_B: &str = "attempt_201401011200_0001_m_000003_1";

fn task(attempt: &str) -> TaskContext {
    let id: TaskAttemptId = attempt.parse().unwrap();
    TaskContext::new(id, HashMap::new())
}

fn new_committer(
    testing: &Testing,
    factory: &FsFactory,
    output: &Path,
    ctx: &TaskContext,
) -> HirodsOutputCommitter {
    let temp = testing.local_path("job-stage").unwrap();
    HirodsOutputCommitter::new(
        Some(output.clone()),
        Some(temp),
        ctx,
        factory,
        &testing.conf,
    )
    .unwrap()
}

// Write `data` at `rel` below the attempt's work path.
fn stage(factory: &FsFactory, committer: &HirodsOutputCommitter, rel: &str, data: &[u8]) {
    let path = committer.work_path().unwrap().join(rel).unwrap();
    let fs = factory.get(&path).unwrap();
    let mut writer = fs.create(&path, true).unwrap();
    writer.write(data).unwrap();
    writer.complete().unwrap();
}

#[test]
fn end_to_end() {
    let testing = Testing::new("commit-end-to-end");
    let factory = testing.factory().unwrap();
    let output = testing.remote_path("job-out");
    let ctx = task(ATTEMPT_A);
    let committer = new_committer(&testing, &factory, &output, &ctx);
    let local = factory.local();

    assert!(committer.is_staged());
    let work = committer.work_path().unwrap().clone();
    assert!(work
        .path()
        .ends_with("/job-stage/_temporary/_attempt_201401011200_0001_m_000003_0"));

    committer.setup_job(&ctx.job_context()).unwrap();
    let temp = committer.temp_path().unwrap().clone();
    assert!(local.is_dir(&temp.join("_temporary").unwrap()).unwrap());

    committer.setup_task(&ctx).unwrap();
    assert!(!committer.needs_task_commit(&ctx).unwrap());

    stage(&factory, &committer, "part-m-00003", b"a\tb\n");
    stage(&factory, &committer, "sub/part-extra", b"sub\n");
    assert!(committer.needs_task_commit(&ctx).unwrap());

    committer.commit_task(&ctx).unwrap();
    assert_eq!(
        testing.session.get(&testing.store_path("job-out/part-m-00003")),
        Some(b"a\tb\n".to_vec())
    );
    assert_eq!(
        testing.session.get(&testing.store_path("job-out/sub/part-extra")),
        Some(b"sub\n".to_vec())
    );
    assert!(!local.exists(&work).unwrap());
    assert!(ctx.heartbeats() > 0);

    committer.commit_job(&ctx.job_context()).unwrap();
    assert!(!local.exists(&temp).unwrap());
    assert_eq!(testing.session.files_under(&testing.store_path("job-out")).len(), 2);
}

#[test]
fn commit_is_idempotent() {
    let testing = Testing::new("commit-idempotent");
    let factory = testing.factory().unwrap();
    let output = testing.remote_path("job-out");
    let ctx = task(ATTEMPT_A);
    let committer = new_committer(&testing, &factory, &output, &ctx);

    committer.setup_job(&ctx).unwrap();
    stage(&factory, &committer, "part-m-00003", b"once");
    committer.commit_task(&ctx).unwrap();

    testing.session.counters().reset();
    committer.commit_task(&ctx).unwrap();
    assert!(!committer.needs_task_commit(&ctx).unwrap());
    assert_eq!(testing.session.counters().outputs(), 0);
    assert_eq!(
        testing.session.get(&testing.store_path("job-out/part-m-00003")),
        Some(b"once".to_vec())
    );

    // Committing a task that never wrote anything is a no-op as well.
    let other = task(ATTEMPT_B);
    let empty = new_committer(&testing, &factory, &output, &other);
    empty.commit_task(&other).unwrap();
    assert_eq!(testing.session.counters().outputs(), 0);
}

#[test]
fn attempts_are_isolated() {
    let testing = Testing::new("commit-isolation");
    let factory = testing.factory().unwrap();
    let output = testing.remote_path("job-out");
    let (ctx_a, ctx_b) = (task(ATTEMPT_A), task(ATTEMPT_B));
    let a = new_committer(&testing, &factory, &output, &ctx_a);
    let b = new_committer(&testing, &factory, &output, &ctx_b);
    let local = factory.local();

    a.setup_job(&ctx_a).unwrap();
    assert_ne!(a.work_path(), b.work_path());

    stage(&factory, &a, "part-m-00003", b"from a");
    stage(&factory, &b, "part-m-00003", b"from b");

    a.abort_task(&ctx_a).unwrap();
    assert!(!local.exists(a.work_path().unwrap()).unwrap());
    assert!(testing
        .session
        .files_under(&testing.store_path("job-out"))
        .is_empty());
    assert!(b.needs_task_commit(&ctx_b).unwrap());

    b.commit_task(&ctx_b).unwrap();
    assert_eq!(
        testing.session.get(&testing.store_path("job-out/part-m-00003")),
        Some(b"from b".to_vec())
    );

    // Aborting again, or aborting with nothing staged, never fails.
    a.abort_task(&ctx_a).unwrap();
    b.abort_task(&ctx_b).unwrap();
}

#[test]
fn last_commit_wins() {
    let testing = Testing::new("commit-last-wins");
    let factory = testing.factory().unwrap();
    let output = testing.remote_path("job-out");
    let (ctx_a, ctx_b) = (task(ATTEMPT_A), task(ATTEMPT_B));
    let a = new_committer(&testing, &factory, &output, &ctx_a);
    let b = new_committer(&testing, &factory, &output, &ctx_b);

    stage(&factory, &a, "part-m-00003", b"from a");
    stage(&factory, &b, "part-m-00003", b"from b, longer");

    a.commit_task(&ctx_a).unwrap();
    b.commit_task(&ctx_b).unwrap();
    assert_eq!(
        testing.session.get(&testing.store_path("job-out/part-m-00003")),
        Some(b"from b, longer".to_vec())
    );
}

#[test]
fn failed_copy_keeps_error() {
    let testing = Testing::new("commit-failed-copy");
    let factory = testing.factory().unwrap();
    let output = testing.remote_path("job-out");
    let ctx = task(ATTEMPT_A);
    let committer = new_committer(&testing, &factory, &output, &ctx);

    stage(&factory, &committer, "part-m-00003", &[7u8; 300]);
    testing.session.set_fail_output(true);
    assert!(committer.commit_task(&ctx).is_err());

    // The staged copy is gone; the attempt can only be rerun.
    assert!(!committer.needs_task_commit(&ctx).unwrap());
}

#[test]
fn partial_commit_then_retry() {
    let testing = Testing::new("commit-partial");
    let factory = testing.factory().unwrap();
    let output = testing.remote_path("job-out");
    let names = ["part-m-00000", "part-m-00001", "part-m-00002"];

    let ctx_a = task(ATTEMPT_A);
    let a = new_committer(&testing, &factory, &output, &ctx_a);
    for name in names {
        stage(&factory, &a, name, b"first");
    }

    // The second remote file can not be opened.
    testing.session.set_output_budget(Some(1));
    assert!(a.commit_task(&ctx_a).is_err());

    let committed = testing.session.files_under(&testing.store_path("job-out"));
    assert_eq!(committed.len(), 1);
    assert_eq!(testing.session.get(&committed[0]), Some(b"first".to_vec()));
    a.abort_task(&ctx_a).unwrap();

    testing.session.set_output_budget(None);
    let ctx_b = task(ATTEMPT_B);
    let b = new_committer(&testing, &factory, &output, &ctx_b);
    for name in names {
        stage(&factory, &b, name, b"second");
    }
    b.commit_task(&ctx_b).unwrap();

    for name in names {
        assert_eq!(
            testing.session.get(&testing.store_path(&format!("job-out/{}", name))),
            Some(b"second".to_vec())
        );
    }
    assert_eq!(testing.session.files_under(&testing.store_path("job-out")).len(), 3);
}

#[test]
fn abort_and_cleanup_job() {
    let testing = Testing::new("commit-abort-job");
    let factory = testing.factory().unwrap();
    let output = testing.remote_path("job-out");
    let ctx = task(ATTEMPT_A);
    let committer = new_committer(&testing, &factory, &output, &ctx);
    let local = factory.local();

    committer.setup_job(&ctx).unwrap();
    stage(&factory, &committer, "part-m-00003", b"never");
    committer
        .abort_job(&ctx.job_context(), JobState::Failed)
        .unwrap();

    assert!(!local.exists(committer.temp_path().unwrap()).unwrap());
    assert!(testing
        .session
        .files_under(&testing.store_path("job-out"))
        .is_empty());

    // Cleaning up twice is fine.
    committer.cleanup_job(&ctx).unwrap();
}

#[test]
fn without_output_path() {
    let testing = Testing::new("commit-no-output");
    let factory = testing.factory().unwrap();
    let ctx = task(ATTEMPT_A);
    let committer =
        HirodsOutputCommitter::new(None, None, &ctx, &factory, &testing.conf).unwrap();

    assert!(committer.work_path().is_none());
    assert!(committer.output_path().is_none());
    committer.setup_job(&ctx).unwrap();
    committer.setup_task(&ctx).unwrap();
    assert!(!committer.needs_task_commit(&ctx).unwrap());
    committer.commit_task(&ctx).unwrap();
    committer.abort_task(&ctx).unwrap();
    committer.commit_job(&ctx).unwrap();
}

#[test]
fn fallback_to_default_committer() {
    let testing = Testing::new("commit-fallback");
    let factory = testing.factory().unwrap();
    let output = testing.local_path("local-out").unwrap();
    let ctx = task(ATTEMPT_A);
    let committer = new_committer(&testing, &factory, &output, &ctx);
    let local = factory.local();

    assert!(!committer.is_staged());
    let work = committer.work_path().unwrap().clone();
    assert!(work
        .path()
        .ends_with("/local-out/_temporary/_attempt_201401011200_0001_m_000003_0"));

    committer.setup_job(&ctx).unwrap();
    stage(&factory, &committer, "part-m-00003", b"local");
    assert!(committer.needs_task_commit(&ctx).unwrap());
    committer.commit_task(&ctx).unwrap();
    committer.commit_job(&ctx).unwrap();

    let out = committer.output_path().unwrap();
    assert!(local.is_file(&out.join("part-m-00003").unwrap()).unwrap());
    assert!(local.is_file(&out.join("_SUCCESS").unwrap()).unwrap());
    assert!(!local.exists(&out.join("_temporary").unwrap()).unwrap());
}

#[test]
fn fallback_disabled() {
    let testing = Testing::with_conf("commit-fallback-never", |c| {
        c.commit_fallback = CommitFallback::Never;
    });
    let factory = testing.factory().unwrap();
    let output = testing.local_path("local-out").unwrap();
    let ctx = task(ATTEMPT_A);
    let committer = new_committer(&testing, &factory, &output, &ctx);

    assert!(committer.is_staged());
    stage(&factory, &committer, "part-m-00003", b"staged");
    committer.commit_task(&ctx).unwrap();

    let local = factory.local();
    let out = committer.output_path().unwrap();
    assert!(local.is_file(&out.join("part-m-00003").unwrap()).unwrap());
}

#[test]
fn output_format_writes_records() {
    let testing = Testing::new("output-format");
    let mut conf = HashMap::new();
    HirodsOutputFormat::set_output_path(&mut conf, &testing.remote_path("job-out"));
    HirodsOutputFormat::set_temp_path(&mut conf, &testing.local_path("job-stage").unwrap());
    assert_eq!(
        HirodsOutputFormat::output_path(&conf).unwrap(),
        Some(testing.remote_path("job-out"))
    );

    let ctx = TaskContext::new(ATTEMPT_A.parse().unwrap(), conf);
    let format = HirodsOutputFormat::new(testing.factory().unwrap());
    let committer = format.output_committer(&ctx).unwrap();
    assert!(std::sync::Arc::ptr_eq(
        &committer,
        &format.output_committer(&ctx).unwrap()
    ));

    let mut writer = format.record_writer(&ctx, ".txt").unwrap();
    assert!(writer.path().path().ends_with("/part-m-00003.txt"));
    writer.write(Some("k"), Some(1)).unwrap();
    writer.write(None::<&str>, Some("only value")).unwrap();
    writer.write(Some("only key"), None::<i32>).unwrap();
    writer.write(None::<&str>, None::<&str>).unwrap();
    writer.close().unwrap();

    committer.commit_task(&ctx).unwrap();
    assert_eq!(
        testing.session.get(&testing.store_path("job-out/part-m-00003.txt")),
        Some(b"k\t1\nonly value\nonly key\n".to_vec())
    );
}
