//! ASCII wire payload: `seq_num=<N>` followed by filler bytes.

use crate::config::FILLER;

const PREFIX: &[u8] = b"seq_num=";

/// Build the datagram for one sequence number. The record is terminated
/// with a single filler byte for compatibility with historical receivers.
pub fn encode(seq_num: u64) -> Vec<u8> {
    let mut datagram = format!("seq_num={seq_num}").into_bytes();
    datagram.push(FILLER);
    datagram
}

/// Parse a received datagram into its sequence number.
///
/// Trailing filler bytes are stripped first. The record must start with
/// `seq_num=` followed by at least one decimal digit; anything after the
/// digit run is ignored. Returns `None` for payloads that do not match.
pub fn parse(data: &[u8]) -> Option<u64> {
    let end = data.iter().rposition(|&b| b != FILLER).map_or(0, |i| i + 1);
    let digits = data[..end].strip_prefix(PREFIX)?;

    let run = digits.iter().take_while(|b| b.is_ascii_digit()).count();
    if run == 0 {
        return None;
    }

    // Digit run is pure ASCII, so the str conversion cannot fail; a value
    // past u64::MAX still comes back None and counts as invalid.
    std::str::from_utf8(&digits[..run]).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_parseable() {
        assert_eq!(parse(&encode(0)), Some(0));
        assert_eq!(parse(&encode(1)), Some(1));
        assert_eq!(parse(&encode(184_467)), Some(184_467));
    }

    #[test]
    fn test_encode_appends_filler() {
        let datagram = encode(42);
        assert_eq!(datagram, b"seq_num=42\0");
    }

    #[test]
    fn test_parse_without_filler() {
        assert_eq!(parse(b"seq_num=7"), Some(7));
    }

    #[test]
    fn test_parse_strips_multiple_fillers() {
        assert_eq!(parse(b"seq_num=7\0\0\0"), Some(7));
    }

    #[test]
    fn test_parse_ignores_bytes_after_digit_run() {
        // Mirrors the unanchored match of the historical implementation.
        assert_eq!(parse(b"seq_num=12abc"), Some(12));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse(b"garbage"), None);
        assert_eq!(parse(b""), None);
        assert_eq!(parse(b"\0\0"), None);
        assert_eq!(parse(b"seq_num="), None);
        assert_eq!(parse(b"seq_num=x9"), None);
        assert_eq!(parse(b"xseq_num=9"), None);
    }

    #[test]
    fn test_parse_rejects_overflow() {
        // One past u64::MAX.
        assert_eq!(parse(b"seq_num=18446744073709551616"), None);
    }

    #[test]
    fn test_parse_truncated_record() {
        // A datagram cut off mid-prefix is just invalid, never an error.
        assert_eq!(parse(b"seq_n"), None);
    }
}
