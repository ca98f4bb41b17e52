// Copyright 2025 eraflo
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

//! Byte-level encoding of diagnostics records.
//!
//! A record is `<timestamp>:<message>{param1}{param2}...\n`, written into a
//! fixed-size scratch buffer. Fields that do not fit are cut and end with a
//! `...` marker. Every field leaves room for its marker and the final
//! newline, so a record always fits the buffer.

use chrono::{DateTime, Utc};
use meridian_core::event::EventValue;

/// Size of the per-thread encoding buffer.
pub const BUFFER_SIZE: usize = 4 * 5120;

const ELLIPSIS: &[u8] = b"...";
// Marker plus the trailing newline, with and without the parameter braces.
const MESSAGE_RESERVE: usize = ELLIPSIS.len() + 1;
const PARAMETER_RESERVE: usize = ELLIPSIS.len() + 3;

/// Appends `text` to `buffer` at `position` and returns the new position.
///
/// Parameters are wrapped in `{}`. When the text exceeds the space left
/// (minus the marker and newline reserve) it is cut on a character boundary
/// and followed by `...`. When not even the marker fits the buffer is left
/// untouched.
pub fn encode_in_buffer(text: &str, is_parameter: bool, buffer: &mut [u8], position: usize) -> usize {
    let reserve = if is_parameter {
        PARAMETER_RESERVE
    } else {
        MESSAGE_RESERVE
    };
    let Some(budget) = buffer.len().checked_sub(position + reserve) else {
        return position;
    };

    let (content, truncated) = if text.len() > budget {
        let mut cut = budget;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        (&text.as_bytes()[..cut], true)
    } else {
        (text.as_bytes(), false)
    };

    let mut pos = position;
    if is_parameter {
        buffer[pos] = b'{';
        pos += 1;
    }
    buffer[pos..pos + content.len()].copy_from_slice(content);
    pos += content.len();
    if truncated {
        buffer[pos..pos + ELLIPSIS.len()].copy_from_slice(ELLIPSIS);
        pos += ELLIPSIS.len();
    }
    if is_parameter {
        buffer[pos] = b'}';
        pos += 1;
    }
    pos
}

/// Renders `time` as ISO-8601 UTC with seven fractional digits.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    // Leap seconds report sub-second nanos above 1e9.
    let ticks = (time.timestamp_subsec_nanos() / 100).min(9_999_999);
    format!("{}.{:07}Z", time.format("%Y-%m-%dT%H:%M:%S"), ticks)
}

/// Encodes a complete record into `buffer` and returns its length in bytes.
///
/// `buffer` must be large enough for the timestamp, the separator and the
/// newline. [`BUFFER_SIZE`] always is.
pub fn format_record(timestamp: &str, message: &str, params: &[EventValue], buffer: &mut [u8]) -> usize {
    let stamp = timestamp.as_bytes();
    let mut pos = stamp.len();
    buffer[..pos].copy_from_slice(stamp);
    buffer[pos] = b':';
    pos += 1;

    pos = encode_in_buffer(message, false, buffer, pos);
    for param in params {
        pos = encode_in_buffer(&param.to_string(), true, buffer, pos);
    }

    buffer[pos] = b'\n';
    pos + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fields_that_fit_are_written_whole() {
        let mut buffer = [0u8; 64];
        let pos = encode_in_buffer("hello", false, &mut buffer, 0);
        let pos = encode_in_buffer("world", true, &mut buffer, pos);
        assert_eq!(&buffer[..pos], b"hello{world}");
    }

    #[test]
    fn test_long_message_is_cut_with_marker() {
        let mut buffer = [0u8; 20];
        let pos = encode_in_buffer(&"a".repeat(40), false, &mut buffer, 4);
        assert_eq!(&buffer[4..pos], b"aaaaaaaaaaaa...");
        // The newline still fits.
        assert_eq!(pos, buffer.len() - 1);
    }

    #[test]
    fn test_long_parameter_is_cut_inside_braces() {
        let mut buffer = [0u8; 16];
        let pos = encode_in_buffer("0123456789ABCDEF", true, &mut buffer, 0);
        assert_eq!(&buffer[..pos], b"{0123456789...}");
        assert!(pos < buffer.len());
    }

    #[test]
    fn test_no_room_for_marker_leaves_buffer_untouched() {
        let mut buffer = [0u8; 8];
        let pos = encode_in_buffer("param", true, &mut buffer, 3);
        assert_eq!(pos, 3);
        assert_eq!(buffer, [0u8; 8]);
    }

    #[test]
    fn test_cut_respects_char_boundaries() {
        let mut buffer = [0u8; 9];
        // 'é' is two bytes: a cut at byte 5 would split the third one.
        let pos = encode_in_buffer("ééééé", false, &mut buffer, 0);
        let written = std::str::from_utf8(&buffer[..pos]).unwrap();
        assert_eq!(written, "éé...");
    }

    #[test]
    fn test_record_layout() {
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let len = format_record(
            "2025-01-02T03:04:05.0000000Z",
            "Failed to collect meter",
            &["http".into(), EventValue::Null, 3u64.into()],
            &mut buffer,
        );
        assert_eq!(
            std::str::from_utf8(&buffer[..len]).unwrap(),
            "2025-01-02T03:04:05.0000000Z:Failed to collect meter{http}{null}{3}\n"
        );
    }

    #[test]
    fn test_oversized_record_still_fits_and_ends_with_newline() {
        let mut buffer = vec![0u8; 128];
        let len = format_record("T", &"m".repeat(500), &[EventValue::from("p")], &mut buffer);
        assert!(len <= buffer.len());
        assert_eq!(buffer[len - 1], b'\n');
        assert!(buffer[..len - 1].ends_with(b"..."));
    }

    #[test]
    fn test_timestamp_has_seven_fraction_digits() {
        let time = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        assert_eq!(format_timestamp(time), "2025-03-04T05:06:07.1234567Z");
    }
}
