//! Boundary scanners: where a username, issue number, or commit SHA token ends.
//!
//! Each scanner looks at the token starting exactly at `start` and returns its
//! exclusive end offset, or `None` when no valid token starts there. Running
//! off the end of the input is a normal stop.

/// Shortest SHA prefix accepted in shorthand text.
pub const MIN_SHA_LENGTH: usize = 7;

/// Longest SHA accepted in shorthand text.
pub const MAX_SHA_LENGTH: usize = 40;

/// Length of the SHA shown in link labels.
pub const ABBREVIATED_SHA_LENGTH: usize = 7;

/// Longest login GitHub allows.
pub const MAX_USERNAME_LENGTH: usize = 39;

/// Offset of the first byte at or after `start` that fails `accept`.
fn run_end(text: &str, start: usize, accept: impl Fn(u8) -> bool) -> usize {
    return bounded_run_end(text, start, usize::MAX, accept);
}

/// Like [`run_end`], but stops after at most `limit` bytes.
fn bounded_run_end(text: &str, start: usize, limit: usize, accept: impl Fn(u8) -> bool) -> usize {
    let bytes = text.as_bytes();
    let stop = start.saturating_add(limit);
    let mut end = start;
    while end < stop && bytes.get(end).copied().is_some_and(&accept) {
        end = end.saturating_add(1);
    }
    return end;
}

/// End of a GitHub login starting at `start`.
///
/// Logins are at most [`MAX_USERNAME_LENGTH`] ASCII letters, digits, and
/// single hyphens, and neither start nor end with a hyphen. The scan never
/// reads past one byte beyond that limit.
pub fn username_end(text: &str, start: usize) -> Option<usize> {
    let end = bounded_run_end(text, start, MAX_USERNAME_LENGTH.saturating_add(1), |b| {
        return b.is_ascii_alphanumeric() || b == b'-';
    });
    let token = text.get(start..end)?;

    if token.is_empty()
        || token.len() > MAX_USERNAME_LENGTH || token.starts_with('-') || token.ends_with('-') || token.contains("--") {
        return None;
    }
    return Some(end);
}

/// End of an issue or pull request number starting at `start`.
///
/// Accepts a digit run, or a digit run wrapped in double quotes (`"26"`), in
/// which case the end is after the closing quote.
pub fn issue_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();

    if bytes.get(start) == Some(&b'"') {
        let digits_start = start.saturating_add(1);
        let digits_end = run_end(text, digits_start, |b| return b.is_ascii_digit());
        if digits_end == digits_start || bytes.get(digits_end) != Some(&b'"') {
            return None;
        }
        return Some(digits_end.saturating_add(1));
    }

    let end = run_end(text, start, |b| return b.is_ascii_digit());
    if end == start {
        return None;
    }
    return Some(end);
}

/// End of a lowercase hex SHA starting at `start`.
///
/// In `strict` mode (URL path segments) any non-empty hex run is accepted.
/// Otherwise the run must be between [`MIN_SHA_LENGTH`] and
/// [`MAX_SHA_LENGTH`] characters.
pub fn sha_end(text: &str, start: usize, strict: bool) -> Option<usize> {
    let end = run_end(text, start, |b| return matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    let length = end.saturating_sub(start);

    let accepted = if strict {
        length > 0
    } else {
        (MIN_SHA_LENGTH..=MAX_SHA_LENGTH).contains(&length)
    };
    return accepted.then_some(end);
}

/// The label form of a SHA: its first seven characters.
pub fn abbreviate_sha(sha: &str) -> &str {
    return sha.get(..ABBREVIATED_SHA_LENGTH).unwrap_or(sha);
}

#[cfg(test)]
#[allow(
    clippy::arithmetic_side_effects,
    clippy::implicit_return,
    clippy::indexing_slicing,
    clippy::missing_assert_message,
    clippy::missing_docs_in_private_items,
    clippy::missing_panics_doc,
    clippy::unwrap_used,
    reason = "tests"
)]
mod tests {
    use super::*;

    #[test]
    fn username_stops_at_slash() {
        assert_eq!(username_end("component/emitter", 0), Some(9));
        assert_eq!(username_end("component/emitter", 10), Some(17));
    }

    #[test]
    fn username_rejects_empty_token() {
        assert_eq!(username_end("/emitter", 0), None);
        assert_eq!(username_end("", 0), None);
        assert_eq!(username_end("abc", 3), None);
    }

    #[test]
    fn username_rejects_bad_hyphens() {
        assert_eq!(username_end("-wooorm", 0), None);
        assert_eq!(username_end("wooorm-/x", 0), None);
        assert_eq!(username_end("woo--orm", 0), None);
        assert_eq!(username_end("w-o-o", 0), Some(5));
    }

    #[test]
    fn username_length_is_capped() {
        let longest = "a".repeat(MAX_USERNAME_LENGTH);
        assert_eq!(username_end(&longest, 0), Some(MAX_USERNAME_LENGTH));
        assert_eq!(username_end(&format!("{longest}#1"), 0), Some(MAX_USERNAME_LENGTH));
        assert_eq!(username_end(&format!("{longest}a"), 0), None);
        assert_eq!(username_end(&"a-".repeat(10_000), 0), None);
    }

    #[test]
    fn issue_digit_run() {
        assert_eq!(issue_end("#26 and", 1), Some(3));
        assert_eq!(issue_end("26", 0), Some(2));
        assert_eq!(issue_end("#x", 1), None);
    }

    #[test]
    fn issue_quoted_keeps_closing_quote() {
        assert_eq!(issue_end("#\"26\" x", 1), Some(5));
        assert_eq!(issue_end("#\"26", 1), None);
        assert_eq!(issue_end("#\"\"", 1), None);
    }

    #[test]
    fn sha_minimum_length_outside_urls() {
        assert_eq!(sha_end("a5c378", 0, false), None);
        assert_eq!(sha_end("a5c3785", 0, false), Some(7));
        assert_eq!(sha_end("a5c3785 fixed", 0, false), Some(7));
        assert_eq!(sha_end("abc", 0, true), Some(3));
    }

    #[test]
    fn sha_maximum_length_outside_urls() {
        let full = "a5c3785ed8d6a35868bc169f07e40e889087fd2e";
        assert_eq!(sha_end(full, 0, false), Some(40));
        let longer = format!("{full}0");
        assert_eq!(sha_end(&longer, 0, false), None);
        assert_eq!(sha_end(&longer, 0, true), Some(41));
    }

    #[test]
    fn sha_is_lowercase_only() {
        assert_eq!(sha_end("A5C3785ED", 0, true), None);
        assert_eq!(sha_end("a5c3785#L10", 0, true), Some(7));
    }

    #[test]
    fn abbreviation_is_seven_chars() {
        assert_eq!(abbreviate_sha("a5c3785ed8d6a35868bc169f07e40e889087fd2e"), "a5c3785");
        assert_eq!(abbreviate_sha("abc"), "abc");
    }
}
