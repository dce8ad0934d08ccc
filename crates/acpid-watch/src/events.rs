//! Raw event decoding.
//!
//! Binary sources deliver the kernel's `struct input_event`:
//!
//! ```text
//! ┌──────────────────────────────┬────────┬────────┬────────────┐
//! │ timestamp (2 × c_long)       │ type   │ code   │ value      │
//! │ ignored                      │ u16    │ u16    │ i32        │
//! └──────────────────────────────┴────────┴────────┴────────────┘
//! ```
//!
//! All fields are in native byte order, as written by the local kernel.
//! Text sources deliver `/proc/acpi/event` lines such as
//! `button/power PWRF 00000080 00000000`.

use crate::error::DecodeError;
use std::fmt;

/// Bytes of the timestamp prefix, which is never inspected.
pub const TIMESTAMP_SIZE: usize = 2 * std::mem::size_of::<libc::c_long>();

/// Size of one `struct input_event`.
pub const INPUT_EVENT_SIZE: usize = TIMESTAMP_SIZE + 8;

/// Length of the trailing ` XXXXXXXX` data field cut from text events.
pub const TEXT_SUFFIX_LEN: usize = 9;

/// The matching-relevant part of one `input_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawInputEvent {
    /// Event type (`EV_KEY`, `EV_SW`, ...).
    pub type_: u16,
    /// Event code (`KEY_POWER`, `SW_LID`, ...).
    pub code: u16,
    /// Event value.
    pub value: i32,
}

impl RawInputEvent {
    /// Create a new event.
    pub fn new(type_: u16, code: u16, value: i32) -> Self {
        Self { type_, code, value }
    }

    /// Press (1) or release (0). Repeats and other values are noise.
    pub fn is_transition(&self) -> bool {
        self.value == 0 || self.value == 1
    }

    /// Encode as a full `input_event` with a zero timestamp.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; TIMESTAMP_SIZE];
        bytes.extend_from_slice(&self.type_.to_ne_bytes());
        bytes.extend_from_slice(&self.code.to_ne_bytes());
        bytes.extend_from_slice(&self.value.to_ne_bytes());
        bytes
    }
}

/// Decode one `input_event` from the start of `bytes`.
pub fn decode_binary(bytes: &[u8]) -> Result<RawInputEvent, DecodeError> {
    if bytes.len() < INPUT_EVENT_SIZE {
        return Err(DecodeError::Truncated {
            expected: INPUT_EVENT_SIZE,
            got: bytes.len(),
        });
    }

    let at = TIMESTAMP_SIZE;
    Ok(RawInputEvent {
        type_: u16::from_ne_bytes([bytes[at], bytes[at + 1]]),
        code: u16::from_ne_bytes([bytes[at + 2], bytes[at + 3]]),
        value: i32::from_ne_bytes([bytes[at + 4], bytes[at + 5], bytes[at + 6], bytes[at + 7]]),
    })
}

/// A text event with its trailing data field removed.
///
/// Kept as raw bytes: the cut can land inside a multi-byte character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrimmedDescription(Vec<u8>);

impl TrimmedDescription {
    /// The trimmed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether nothing is left after trimming.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TrimmedDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Strip the newline and the trailing [`TEXT_SUFFIX_LEN`] bytes of a line.
///
/// Lines shorter than the suffix are kept whole.
pub fn decode_text(line: &[u8]) -> TrimmedDescription {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let keep = match line.len().checked_sub(TEXT_SUFFIX_LEN) {
        Some(len) => &line[..len],
        None => line,
    };
    TrimmedDescription(keep.to_vec())
}

/// A decoded event, ready for resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanonicalEvent {
    /// From a binary input device.
    Binary(RawInputEvent),
    /// From a legacy text source.
    Text(TrimmedDescription),
}

impl CanonicalEvent {
    /// Accept a binary event only if it is a press or a release.
    pub fn from_raw(event: RawInputEvent) -> Option<Self> {
        event.is_transition().then_some(Self::Binary(event))
    }

    /// Wrap a text event. An empty description is a prefix of every entry.
    pub fn from_text(text: TrimmedDescription) -> Self {
        Self::Text(text)
    }
}

impl fmt::Display for CanonicalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Binary(ev) => write!(
                f,
                "type 0x{:02x} code {} value {}",
                ev.type_, ev.code, ev.value
            ),
            Self::Text(text) => write!(f, "{}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_event_size_matches_kernel_struct() {
        assert_eq!(INPUT_EVENT_SIZE, std::mem::size_of::<libc::input_event>());
    }

    #[test]
    fn test_decode_binary_reads_type_code_value() {
        let bytes = RawInputEvent::new(0x01, 116, 1).to_bytes();
        assert_eq!(bytes.len(), INPUT_EVENT_SIZE);
        assert_eq!(
            decode_binary(&bytes).unwrap(),
            RawInputEvent::new(0x01, 116, 1)
        );
    }

    #[test]
    fn test_decode_binary_ignores_timestamp() {
        let mut bytes = RawInputEvent::new(0x05, 0, 0).to_bytes();
        bytes[..TIMESTAMP_SIZE].fill(0xab);
        assert_eq!(decode_binary(&bytes).unwrap(), RawInputEvent::new(0x05, 0, 0));
    }

    #[test]
    fn test_decode_binary_short_read_is_truncated() {
        let bytes = RawInputEvent::new(0x01, 116, 1).to_bytes();
        let err = decode_binary(&bytes[..INPUT_EVENT_SIZE - 1]).unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                expected: INPUT_EVENT_SIZE,
                got: INPUT_EVENT_SIZE - 1
            }
        );
    }

    #[test_case(0, true ; "release")]
    #[test_case(1, true ; "press")]
    #[test_case(2, false ; "autorepeat")]
    #[test_case(-1, false ; "negative")]
    fn test_transition_filter(value: i32, accepted: bool) {
        let event = RawInputEvent::new(0x01, 116, value);
        assert_eq!(event.is_transition(), accepted);
        assert_eq!(CanonicalEvent::from_raw(event).is_some(), accepted);
    }

    #[test_case(b"button/power PWRF 00000080 00000000\n", "button/power PWRF 00000080" ; "with newline")]
    #[test_case(b"button/power PWRF 00000080 00000000", "button/power PWRF 00000080" ; "without newline")]
    #[test_case(b"123456789", "" ; "exactly suffix")]
    #[test_case(b"short", "short" ; "shorter than suffix")]
    fn test_decode_text(line: &[u8], expected: &str) {
        assert_eq!(decode_text(line).as_bytes(), expected.as_bytes());
    }

    #[test]
    fn test_empty_text_is_still_an_event() {
        let text = decode_text(b"ac_adapte\n");
        assert!(text.is_empty());
        assert_eq!(
            CanonicalEvent::from_text(text),
            CanonicalEvent::Text(TrimmedDescription(Vec::new()))
        );
    }

    #[test]
    fn test_cut_inside_multibyte_character_keeps_raw_bytes() {
        // "é" is 0xC3 0xA9; the 9-byte cut removes only 0xA9.
        let text = decode_text("hotkey/é 0000000\n".as_bytes());
        assert_eq!(text.as_bytes(), b"hotkey/\xC3");
    }
}
