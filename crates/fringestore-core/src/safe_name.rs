//! Reversible filename-safe encoding for index artifact names.
//!
//! Any byte outside `[A-Za-z0-9_.-]` becomes `%HH` (two uppercase hex
//! digits); `%` itself is escaped the same way so the transform is its own
//! unambiguous inverse. Exposed publicly because index artifacts are
//! discoverable by directory listing (spec §3).

const fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'_' | b'.' | b'-')
}

/// Encode an arbitrary string into a filesystem-safe artifact name.
#[must_use]
pub fn filename_safe(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.as_bytes() {
        if is_unreserved(*byte) {
            out.push(*byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Decode a filename-safe artifact name back to its original string.
///
/// Returns `None` if the input contains a malformed `%` escape (not
/// followed by two valid hex digits) or is not valid UTF-8 once decoded.
#[must_use]
pub fn filename_unsafe(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hex_str = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex_str, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn escapes_reserved_bytes() {
        assert_eq!(filename_safe("a/b"), "a%2Fb");
        assert_eq!(filename_safe("100%"), "100%25");
        assert_eq!(filename_safe("plain-ok_.1"), "plain-ok_.1");
    }

    #[test]
    fn unsafe_rejects_malformed_escape() {
        assert_eq!(filename_unsafe("a%2"), None);
        assert_eq!(filename_unsafe("a%zz"), None);
    }

    proptest! {
        #[test]
        fn round_trip_any_string(s in ".*") {
            let safe = filename_safe(&s);
            prop_assert_eq!(filename_unsafe(&safe), Some(s));
        }

        #[test]
        fn safe_names_only_contain_unreserved_bytes(s in ".*") {
            let safe = filename_safe(&s);
            prop_assert!(safe.bytes().all(is_unreserved));
        }
    }
}
