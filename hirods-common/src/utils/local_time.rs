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

use chrono::{Local, TimeZone, Utc};

pub struct LocalTime;

impl LocalTime {
    const FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    pub fn mills() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn now_datetime() -> String {
        Local::now().format(Self::FORMAT).to_string()
    }

    /// Render epoch milliseconds in local time; empty when out of range.
    pub fn format_mills(mills: i64) -> String {
        match Local.timestamp_millis_opt(mills).single() {
            Some(v) => v.format(Self::FORMAT).to_string(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LocalTime;

    #[test]
    fn format() {
        assert_eq!(LocalTime::format_mills(LocalTime::mills()).len(), 19);
        assert!(LocalTime::format_mills(i64::MAX).is_empty());
    }
}
