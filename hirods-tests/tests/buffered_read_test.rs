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

use hirods_common::conf::SeekPolicy;
use hirods_common::fs::{FileSystem, Reader};
use hirods_common::utils::Utils;
use hirods_tests::Testing;
use hirods_ufs::irods::IrodsReader;
use hirods_ufs::stream::BufferedReader;
use std::io::Read;

const WINDOW: usize = 16;

fn setup(name: &str, policy: SeekPolicy, data: &[u8]) -> (Testing, BufferedReader<IrodsReader>) {
    let testing = Testing::with_conf(name, |c| {
        c.input_buffer_size = WINDOW;
        c.seek_policy = policy;
    });
    testing.session.put(&testing.store_path("data.bin"), data);

    let fs = testing.remote_fs().unwrap();
    let reader = fs
        .open_with_buffer(&testing.remote_path("data.bin"), WINDOW)
        .unwrap();
    testing.session.counters().reset();
    (testing, reader)
}

fn read_to_end(reader: &mut BufferedReader<IrodsReader>, chunk: usize) -> Vec<u8> {
    let mut out = vec![];
    let mut buf = vec![0u8; chunk];
    loop {
        let n = Reader::read(reader, &mut buf).unwrap();
        if n == 0 {
            break;
        }
        assert!(n <= chunk);
        out.extend_from_slice(&buf[..n]);
        assert!(reader.pos() <= reader.len());
    }
    out
}

#[test]
fn sequential_read() {
    let data = Utils::rand_bytes(100);
    let (testing, mut reader) = setup("sequential-read", SeekPolicy::Window, &data);

    assert_eq!(reader.len(), 100);
    assert_eq!(read_to_end(&mut reader, 7), data);
    assert_eq!(reader.pos(), 100);

    // One fetch per window, each continuing where the last one ended.
    let log = testing.session.counters().read_log();
    let starts: Vec<i64> = log.iter().map(|x| x.0).collect();
    assert_eq!(starts, vec![0, 16, 32, 48, 64, 80, 96]);
    assert!(log.iter().all(|x| x.1 <= WINDOW));
    assert_eq!(testing.session.counters().seeks(), 0);

    // End of file is reported without another round trip.
    let mut buf = [0u8; 8];
    assert_eq!(Reader::read(&mut reader, &mut buf).unwrap(), 0);
    assert_eq!(reader.read_byte().unwrap(), None);
    assert_eq!(testing.session.counters().reads(), 7);
}

#[test]
fn short_remote_reads() {
    let data = Utils::rand_bytes(57);
    let (testing, mut reader) = setup("short-remote-reads", SeekPolicy::Window, &data);
    testing.session.set_max_read(5);

    assert_eq!(read_to_end(&mut reader, 13), data);
    assert_eq!(testing.session.counters().seeks(), 0);

    let starts: Vec<i64> = testing
        .session
        .counters()
        .read_log()
        .iter()
        .map(|x| x.0)
        .collect();
    let expected: Vec<i64> = (0..57).step_by(5).collect();
    assert_eq!(starts, expected);
}

#[test]
fn same_bytes_for_any_chunking() {
    let data = Utils::rand_bytes(3 * WINDOW + 5);
    for chunk in [1, 3, WINDOW - 1, WINDOW, WINDOW + 1, 200] {
        let (_testing, mut reader) = setup("chunking", SeekPolicy::Window, &data);
        assert_eq!(read_to_end(&mut reader, chunk), data, "chunk {}", chunk);
    }

    let (_testing, mut reader) = setup("read-byte", SeekPolicy::Window, &data);
    let mut out = vec![];
    while let Some(b) = reader.read_byte().unwrap() {
        out.push(b);
    }
    assert_eq!(out, data);
}

#[test]
fn seek_inside_window() {
    let data = Utils::rand_bytes(64);
    let (testing, mut reader) = setup("seek-inside-window", SeekPolicy::Window, &data);
    let counters = testing.session.counters().clone();

    let mut buf = [0u8; 4];
    Reader::read(&mut reader, &mut buf).unwrap();
    assert_eq!(counters.reads(), 1);

    for pos in [10, 2, 0, 15] {
        reader.seek(pos).unwrap();
        assert_eq!(reader.pos(), pos);
        let n = Reader::read(&mut reader, &mut buf[..1]).unwrap();
        assert_eq!(n, 1);
        assert_eq!(buf[0], data[pos as usize]);
    }

    assert_eq!(counters.reads(), 1);
    assert_eq!(counters.seeks(), 0);
}

#[test]
fn seek_outside_window() {
    let data = Utils::rand_bytes(64);
    let (testing, mut reader) = setup("seek-outside-window", SeekPolicy::Window, &data);
    let counters = testing.session.counters().clone();

    let mut buf = [0u8; 4];
    Reader::read(&mut reader, &mut buf).unwrap();

    reader.seek(40).unwrap();
    assert_eq!(reader.pos(), 40);
    assert_eq!(reader.buffered(), 0);
    assert_eq!(counters.seeks(), 1);

    let n = Reader::read(&mut reader, &mut buf).unwrap();
    assert_eq!(&buf[..n], &data[40..40 + n]);
    assert_eq!(counters.reads(), 2);
    assert_eq!(counters.read_log()[1], (40, WINDOW));

    // Backwards out of the window costs the same.
    reader.seek(3).unwrap();
    let n = Reader::read(&mut reader, &mut buf).unwrap();
    assert_eq!(&buf[..n], &data[3..3 + n]);
    assert_eq!(counters.seeks(), 2);
    assert_eq!(counters.reads(), 3);
}

#[test]
fn invalidate_policy_always_refetches() {
    let data = Utils::rand_bytes(64);
    let (testing, mut reader) = setup("invalidate-policy", SeekPolicy::Invalidate, &data);
    let counters = testing.session.counters().clone();

    let mut buf = [0u8; 4];
    Reader::read(&mut reader, &mut buf).unwrap();
    reader.seek(8).unwrap();
    let n = Reader::read(&mut reader, &mut buf).unwrap();
    assert_eq!(&buf[..n], &data[8..8 + n]);

    assert_eq!(counters.seeks(), 1);
    assert_eq!(counters.reads(), 2);
}

#[test]
fn seek_bounds() {
    let data = Utils::rand_bytes(20);
    let (_testing, mut reader) = setup("seek-bounds", SeekPolicy::Window, &data);

    assert!(reader.seek(-1).is_err());
    assert!(reader.seek(21).is_err());

    reader.seek(20).unwrap();
    assert_eq!(reader.pos(), 20);
    let mut buf = [0u8; 4];
    assert_eq!(Reader::read(&mut reader, &mut buf).unwrap(), 0);
}

#[test]
fn skip_clips_at_end() {
    let data = Utils::rand_bytes(50);
    let (testing, mut reader) = setup("skip", SeekPolicy::Window, &data);

    assert_eq!(reader.skip(0).unwrap(), 0);
    assert_eq!(reader.skip(-3).unwrap(), 0);

    let mut buf = [0u8; 2];
    Reader::read(&mut reader, &mut buf).unwrap();
    assert_eq!(reader.skip(5).unwrap(), 5);
    assert_eq!(reader.pos(), 7);
    assert_eq!(testing.session.counters().reads(), 1);

    assert_eq!(reader.skip(30).unwrap(), 30);
    assert_eq!(reader.pos(), 37);
    assert_eq!(reader.read_byte().unwrap(), Some(data[37]));

    assert_eq!(reader.skip(100).unwrap(), 12);
    assert_eq!(reader.pos(), 50);
    assert_eq!(reader.skip(1).unwrap(), 0);
}

#[test]
fn empty_file() {
    let (testing, mut reader) = setup("empty-file", SeekPolicy::Window, &[]);
    assert!(reader.is_empty());
    assert_eq!(read_to_end(&mut reader, 8), Vec::<u8>::new());
    assert_eq!(reader.skip(4).unwrap(), 0);
    assert_eq!(testing.session.counters().reads(), 0);
}

#[test]
fn closed_reader() {
    let data = Utils::rand_bytes(30);
    let (_testing, mut reader) = setup("closed-reader", SeekPolicy::Window, &data);

    reader.complete().unwrap();
    reader.complete().unwrap();
    assert!(reader.is_closed());
    assert_eq!(reader.available(), 0);

    let mut buf = [0u8; 4];
    assert!(Reader::read(&mut reader, &mut buf).is_err());
    assert!(reader.seek(0).is_err());
    assert!(reader.skip(1).is_err());
    assert!(reader.read_byte().is_err());
}

#[test]
fn mark_is_unsupported() {
    let data = Utils::rand_bytes(10);
    let (_testing, mut reader) = setup("mark", SeekPolicy::Window, &data);
    assert!(!reader.mark_supported());
    reader.mark(4);
    assert!(reader.reset().is_err());
}

#[test]
fn open_through_filesystem() {
    let testing = Testing::new("open-through-filesystem");
    let data = Utils::rand_bytes(300 * 1024);
    testing.session.put(&testing.store_path("big.bin"), &data);

    let fs = testing.remote_fs().unwrap();
    let mut reader = fs.open(&testing.remote_path("big.bin")).unwrap();
    let mut out = vec![];
    let mut buf = vec![0u8; 4096];
    loop {
        let n = Reader::read(&mut reader, &mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, data);

    // Default window is 100 KiB.
    assert_eq!(testing.session.counters().reads(), 3);
    assert!(fs.open(&testing.remote_path("missing.bin")).is_err());
    assert!(fs.open(&testing.remote_path("")).is_err());
}

#[test]
fn std_io_read() {
    let data = Utils::rand_bytes(45);
    let (_testing, mut reader) = setup("std-io-read", SeekPolicy::Window, &data);
    let mut out = vec![];
    Read::read_to_end(&mut reader, &mut out).unwrap();
    assert_eq!(out, data);
}
