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

mod remote_session;
pub use self::remote_session::*;

mod remote_file;
pub use self::remote_file::RemoteFile;

mod irods_account;
pub use self::irods_account::IrodsAccount;

mod dir_session;
pub use self::dir_session::DirSession;

mod fs_statistics;
pub use self::fs_statistics::FsStatistics;

mod irods_reader;
pub use self::irods_reader::IrodsReader;

mod irods_writer;
pub use self::irods_writer::IrodsWriter;

mod irods_filesystem;
pub use self::irods_filesystem::HirodsFileSystem;
