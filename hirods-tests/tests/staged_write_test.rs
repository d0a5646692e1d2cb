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
use hirods_common::fs::{FileSystem, Reader, Writer};
use hirods_common::utils::Utils;
use hirods_tests::Testing;
use std::path::PathBuf;

fn staged(name: &str) -> Testing {
    Testing::with_conf(name, |c| {
        c.staged_writes = true;
        c.output_buffer_size = 16;
        c.input_buffer_size = 16;
    })
}

// Regular files left anywhere below `dir`.
fn local_files(dir: &str) -> Vec<PathBuf> {
    let mut res = vec![];
    let mut stack = vec![PathBuf::from(dir)];
    while let Some(d) = stack.pop() {
        let entries = match std::fs::read_dir(&d) {
            Ok(v) => v,
            Err(_) => continue,
        };
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                res.push(path);
            }
        }
    }
    res
}

// Entries of any kind directly below `dir`.
fn staging_entries(dir: &str) -> usize {
    match std::fs::read_dir(dir) {
        Ok(v) => v.count(),
        Err(_) => 0,
    }
}

fn write_chunks(writer: &mut Box<dyn Writer>, data: &[u8], chunk: usize) {
    for part in data.chunks(chunk) {
        writer.write(part).unwrap();
    }
}

#[test]
fn staged_round_trip() {
    let testing = staged("staged-round-trip");
    let fs = testing.remote_fs().unwrap();

    for size in [0, 1, 15, 16, 17, 100, 1000] {
        let name = format!("out/file-{}.bin", size);
        let path = testing.remote_path(&name);
        let data = Utils::rand_bytes(size);

        let mut writer = fs.create(&path, false).unwrap();
        write_chunks(&mut writer, &data, 7);
        assert_eq!(writer.pos(), size as i64);

        // Nothing reaches the store before the writer completes.
        assert_eq!(testing.session.get(&testing.store_path(&name)), None);
        assert_eq!(local_files(&testing.staging_dir()).len(), 1);

        writer.complete().unwrap();
        assert_eq!(testing.session.get(&testing.store_path(&name)), Some(data.clone()));
        assert!(local_files(&testing.staging_dir()).is_empty());

        let mut reader = fs.open(&path).unwrap();
        let mut out = vec![];
        let mut buf = [0u8; 11];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        assert_eq!(out, data, "size {}", size);
    }

    assert_eq!(fs.statistics().bytes_written(), 1149);
}

#[test]
fn direct_round_trip() {
    let testing = Testing::with_conf("direct-round-trip", |c| c.output_buffer_size = 16);
    let fs = testing.remote_fs().unwrap();
    let path = testing.remote_path("direct.bin");
    let data = Utils::rand_bytes(70);

    let mut writer = fs.create(&path, false).unwrap();
    write_chunks(&mut writer, &data, 9);
    writer.complete().unwrap();

    assert_eq!(testing.session.get(&testing.store_path("direct.bin")), Some(data));
    assert!(local_files(&testing.staging_dir()).is_empty());
}

#[test]
fn failed_upload_removes_staging() {
    let testing = staged("failed-upload");
    let fs = testing.remote_fs().unwrap();

    let mut writer = fs.create(&testing.remote_path("broken.bin"), false).unwrap();
    write_chunks(&mut writer, &Utils::rand_bytes(100), 10);
    testing.session.set_fail_output(true);

    assert!(writer.complete().is_err());
    assert!(local_files(&testing.staging_dir()).is_empty());
    assert_eq!(staging_entries(&testing.staging_dir()), 0);

    // Already finished.
    writer.complete().unwrap();
}

#[test]
fn cancel_and_drop_discard() {
    let testing = staged("cancel-and-drop");
    let fs = testing.remote_fs().unwrap();

    let mut writer = fs.create(&testing.remote_path("a.bin"), false).unwrap();
    write_chunks(&mut writer, &Utils::rand_bytes(40), 8);
    writer.cancel().unwrap();
    assert!(local_files(&testing.staging_dir()).is_empty());
    assert_eq!(staging_entries(&testing.staging_dir()), 0);
    assert_eq!(testing.session.get(&testing.store_path("a.bin")), None);
    assert!(writer.write(b"late").is_err());

    let mut writer = fs.create(&testing.remote_path("b.bin"), false).unwrap();
    write_chunks(&mut writer, &Utils::rand_bytes(40), 8);
    drop(writer);
    assert!(local_files(&testing.staging_dir()).is_empty());
    assert_eq!(staging_entries(&testing.staging_dir()), 0);
    assert_eq!(testing.session.counters().outputs(), 0);
}

#[test]
fn staging_dirs_are_reclaimed() {
    let testing = staged("staging-dirs");
    let fs = testing.remote_fs().unwrap();

    for i in 0..5 {
        let mut writer = fs.create(&testing.remote_path(&format!("f{}.bin", i)), false).unwrap();
        write_chunks(&mut writer, &Utils::rand_bytes(20), 7);
        writer.complete().unwrap();
    }

    assert_eq!(staging_entries(&testing.staging_dir()), 0);
    assert_eq!(testing.session.files_under(Testing::HOME).len(), 5);
}

#[test]
fn write_after_complete() {
    let testing = staged("write-after-complete");
    let fs = testing.remote_fs().unwrap();

    let mut writer = fs.create(&testing.remote_path("c.bin"), false).unwrap();
    writer.write(b"hello").unwrap();
    writer.flush().unwrap();
    writer.complete().unwrap();
    writer.complete().unwrap();

    let err = writer.write(b"again").unwrap_err();
    assert!(matches!(err, FsError::StreamClosed(_)));
    assert_eq!(
        testing.session.get(&testing.store_path("c.bin")),
        Some(b"hello".to_vec())
    );
}

#[test]
fn create_semantics() {
    let testing = staged("create-semantics");
    let fs = testing.remote_fs().unwrap();
    testing.session.put(&testing.store_path("exists.txt"), b"old");

    let path = testing.remote_path("exists.txt");
    let err = fs.create(&path, false).err().unwrap();
    assert!(matches!(err, FsError::FileAlreadyExists(_)));

    let mut writer = fs.create(&path, true).unwrap();
    writer.write(b"new").unwrap();
    writer.complete().unwrap();
    assert_eq!(
        testing.session.get(&testing.store_path("exists.txt")),
        Some(b"new".to_vec())
    );

    // Missing parents are created; a directory can not be replaced.
    let mut writer = fs.create(&testing.remote_path("x/y/z.txt"), false).unwrap();
    writer.complete().unwrap();
    assert!(testing.session.is_dir(&testing.store_path("x/y")));
    assert!(fs.create(&testing.remote_path("x"), true).is_err());

    assert!(matches!(
        fs.append(&path).err().unwrap(),
        FsError::Unsupported(_)
    ));
}
