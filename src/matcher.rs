//! Recognize shorthand GitHub references in a run of prose.
//!
//! Patterns are tried at every token boundary in precedence order; the first
//! one that matches wins and scanning resumes after it:
//!
//! 1. `user@sha`, `user/project@sha`
//! 2. `@user`
//! 3. `user#N`, `user/project#N`
//! 4. `GH-N`
//! 5. `#N`, `#"N"`
//! 6. a bare SHA of 7 to 40 hex characters

use std::ops::Range;

use crate::boundary::{issue_end, sha_end, username_end};
use crate::types::{Reference, ReferenceKind};

/// Literal prefix of repository-implicit issue references.
const GH_ISSUE_PREFIX: &str = "GH-";

/// Lazily scan `text` for references, left to right, without overlap.
pub const fn scan(text: &str) -> Matches<'_> {
    return Matches { cursor: 0, text };
}

/// Iterator returned by [`scan`].
#[derive(Debug, Clone)]
pub struct Matches<'t> {
    /// Next offset to try.
    cursor: usize,
    /// Text being scanned.
    text: &'t str,
}

impl Iterator for Matches<'_> {
    type Item = Reference;

    fn next(&mut self) -> Option<Reference> {
        while self.cursor < self.text.len() {
            let start = self.cursor;
            if let Some(reference) = match_at(self.text, start) {
                self.cursor = reference.span.end;
                return Some(reference);
            }
            self.cursor = next_char_boundary(self.text, start);
        }
        return None;
    }
}

/// Offset of the character after the one at `offset`.
fn next_char_boundary(text: &str, offset: usize) -> usize {
    let width = text.get(offset..).and_then(|rest| return rest.chars().next()).map_or(1, char::len_utf8);
    return offset.saturating_add(width);
}

/// Characters that glue a token to its neighbour.
fn is_word_char(c: char) -> bool {
    return c.is_alphanumeric() || c == '_';
}

/// Whether a token may start at `offset`: no word character right before it.
fn starts_token(text: &str, offset: usize) -> bool {
    return text
        .get(..offset)
        .is_some_and(|before| return before.chars().next_back().is_none_or(|c| return !is_word_char(c)));
}

/// Whether a token may end at `offset`: no word character right after it.
fn ends_token(text: &str, offset: usize) -> bool {
    return text
        .get(offset..)
        .is_some_and(|after| return after.chars().next().is_none_or(|c| return !is_word_char(c)));
}

/// Whether `offset` is a `.` followed by a letter, as in a domain name.
fn continues_as_domain(text: &str, offset: usize) -> bool {
    return byte_at(text, offset) == Some(b'.')
        && byte_at(text, offset.saturating_add(1)).is_some_and(|b| return b.is_ascii_alphabetic());
}

/// Byte at `offset`, if any.
fn byte_at(text: &str, offset: usize) -> Option<u8> {
    return text.as_bytes().get(offset).copied();
}

/// A `user` or `user/project` prefix.
struct Attribution {
    /// End of the whole prefix.
    end: usize,
    /// Project range, when present.
    project: Option<Range<usize>>,
    /// User range.
    user: Range<usize>,
}

impl Attribution {
    /// Parse a `user` or `user/project` prefix starting at `start`.
    fn parse(text: &str, start: usize) -> Option<Self> {
        let user_end = username_end(text, start)?;
        if byte_at(text, user_end) != Some(b'/') {
            return Some(Self { end: user_end, project: None, user: start..user_end });
        }

        let project_start = user_end.saturating_add(1);
        let project_end = username_end(text, project_start)?;
        return Some(Self {
            end: project_end,
            project: Some(project_start..project_end),
            user: start..user_end,
        });
    }

    /// Owned user and project strings.
    fn names(&self, text: &str) -> (Option<String>, Option<String>) {
        let user = text.get(self.user.clone()).map(str::to_string);
        let project = self.project.clone().and_then(|range| return text.get(range)).map(str::to_string);
        return (user, project);
    }
}

/// Try every pattern at `start`, in precedence order.
fn match_at(text: &str, start: usize) -> Option<Reference> {
    let first = byte_at(text, start)?;
    if !first.is_ascii() || !starts_token(text, start) {
        return None;
    }

    return match_user_sha(text, start)
        .or_else(|| return match_mention(text, start))
        .or_else(|| return match_user_issue(text, start))
        .or_else(|| return match_gh_issue(text, start))
        .or_else(|| return match_hash_issue(text, start))
        .or_else(|| return match_sha(text, start));
}

/// Assemble a reference from its parts.
fn reference(
    text: &str,
    kind: ReferenceKind,
    span: Range<usize>,
    value: Range<usize>,
    names: (Option<String>, Option<String>),
) -> Option<Reference> {
    let is_sha = matches!(kind, ReferenceKind::Sha | ReferenceKind::UserSha);
    let has_comment_suffix = is_sha
        && byte_at(text, span.end) == Some(b'#')
        && text.len() > span.end.saturating_add(1);
    let (user, project) = names;

    return Some(Reference {
        has_comment_suffix,
        kind,
        marker: text.get(span.clone())?.to_string(),
        project,
        span,
        user,
        value: text.get(value)?.to_string(),
    });
}

/// `user@sha` and `user/project@sha`.
fn match_user_sha(text: &str, start: usize) -> Option<Reference> {
    let attribution = Attribution::parse(text, start)?;
    if byte_at(text, attribution.end) != Some(b'@') {
        return None;
    }
    let sha_start = attribution.end.saturating_add(1);
    let end = sha_end(text, sha_start, false)?;
    if !ends_token(text, end) || continues_as_domain(text, end) {
        return None;
    }
    return reference(text, ReferenceKind::UserSha, start..end, sha_start..end, attribution.names(text));
}

/// `@user`, unless it continues into a `user/project` path.
fn match_mention(text: &str, start: usize) -> Option<Reference> {
    if byte_at(text, start) != Some(b'@') {
        return None;
    }
    let user_start = start.saturating_add(1);
    let end = username_end(text, user_start)?;
    if byte_at(text, end) == Some(b'/') || !ends_token(text, end) {
        return None;
    }
    let user = text.get(user_start..end).map(str::to_string);
    return reference(text, ReferenceKind::Mention, start..end, user_start..end, (user, None));
}

/// `user#N` and `user/project#N`.
fn match_user_issue(text: &str, start: usize) -> Option<Reference> {
    let attribution = Attribution::parse(text, start)?;
    if byte_at(text, attribution.end) != Some(b'#') {
        return None;
    }
    let number_start = attribution.end.saturating_add(1);
    let end = issue_end(text, number_start)?;
    if !ends_token(text, end) {
        return None;
    }
    return reference(
        text,
        ReferenceKind::UserIssueOrPr,
        start..end,
        number_start..end,
        attribution.names(text),
    );
}

/// `GH-N`.
fn match_gh_issue(text: &str, start: usize) -> Option<Reference> {
    if !text.get(start..)?.starts_with(GH_ISSUE_PREFIX) {
        return None;
    }
    let number_start = start.saturating_add(GH_ISSUE_PREFIX.len());
    let end = issue_end(text, number_start)?;
    if !ends_token(text, end) {
        return None;
    }
    return reference(text, ReferenceKind::IssueOrPr, start..end, number_start..end, (None, None));
}

/// `#N` and `#"N"`.
fn match_hash_issue(text: &str, start: usize) -> Option<Reference> {
    if byte_at(text, start) != Some(b'#') {
        return None;
    }
    let number_start = start.saturating_add(1);
    let end = issue_end(text, number_start)?;
    if !ends_token(text, end) {
        return None;
    }
    return reference(text, ReferenceKind::IssueOrPr, start..end, number_start..end, (None, None));
}

/// A bare SHA.
fn match_sha(text: &str, start: usize) -> Option<Reference> {
    let end = sha_end(text, start, false)?;
    if !ends_token(text, end) || continues_as_domain(text, end) {
        return None;
    }
    return reference(text, ReferenceKind::Sha, start..end, start..end, (None, None));
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

    const SHA: &str = "a5c3785ed8d6a35868bc169f07e40e889087fd2e";

    fn kinds(text: &str) -> Vec<(ReferenceKind, String)> {
        return scan(text).map(|r| return (r.kind, r.marker)).collect();
    }

    #[test]
    fn bare_sha() {
        let refs: Vec<Reference> = scan(&format!("Fixed in {SHA}.")).collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::Sha);
        assert_eq!(refs[0].value, SHA);
        assert_eq!(refs[0].span, 9..49);
    }

    #[test]
    fn user_sha_wins_over_mention() {
        let refs: Vec<Reference> = scan(&format!("wooorm@{SHA}")).collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::UserSha);
        assert_eq!(refs[0].user.as_deref(), Some("wooorm"));
        assert_eq!(refs[0].project, None);
        assert_eq!(refs[0].value, SHA);
    }

    #[test]
    fn user_project_sha() {
        let refs: Vec<Reference> = scan("see remarkjs/remark@1234567 now").collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].user.as_deref(), Some("remarkjs"));
        assert_eq!(refs[0].project.as_deref(), Some("remark"));
        assert_eq!(refs[0].marker, "remarkjs/remark@1234567");
    }

    #[test]
    fn mention() {
        let refs: Vec<Reference> = scan("Thanks @wooorm!").collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, ReferenceKind::Mention);
        assert_eq!(refs[0].user.as_deref(), Some("wooorm"));
        assert_eq!(refs[0].span, 7..14);
    }

    #[test]
    fn email_is_not_a_mention() {
        assert!(kinds("mail foo@bar.com please").is_empty());
    }

    #[test]
    fn email_with_hex_domain_is_not_a_commit() {
        assert!(kinds("mail dev@deadbeef.io please").is_empty());
        assert!(kinds("see deadbeef.io").is_empty());
        assert_eq!(kinds("wooorm@deadbeef. Next"), vec![(ReferenceKind::UserSha, "wooorm@deadbeef".to_string())]);
    }

    #[test]
    fn long_hyphenated_words_scan_in_linear_time() {
        let text = format!("{}a", "a-".repeat(100_000));
        let started = std::time::Instant::now();
        assert_eq!(scan(&text).count(), 0);
        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn mention_followed_by_slash_is_skipped() {
        assert!(kinds("@wooorm/remark").is_empty());
    }

    #[test]
    fn issue_forms() {
        assert_eq!(
            kinds("#26, GH-27, wooorm#28 and wooorm/remark#29"),
            vec![
                (ReferenceKind::IssueOrPr, "#26".to_string()),
                (ReferenceKind::IssueOrPr, "GH-27".to_string()),
                (ReferenceKind::UserIssueOrPr, "wooorm#28".to_string()),
                (ReferenceKind::UserIssueOrPr, "wooorm/remark#29".to_string()),
            ]
        );
    }

    #[test]
    fn quoted_issue_keeps_quotes() {
        let refs: Vec<Reference> = scan("see #\"1\" here").collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].value, "\"1\"");
        assert_eq!(refs[0].marker, "#\"1\"");
    }

    #[test]
    fn gh_prefix_is_case_sensitive() {
        assert!(kinds("gh-26 Gh-26").is_empty());
    }

    #[test]
    fn hash_inside_identifier_is_skipped() {
        assert!(kinds("snake_case#1 abc#").is_empty());
        assert!(kinds("issue#26x").is_empty());
    }

    #[test]
    fn login_like_word_before_hash_is_an_attribution() {
        assert_eq!(kinds("color#1"), vec![(ReferenceKind::UserIssueOrPr, "color#1".to_string())]);
    }

    #[test]
    fn sha_needs_boundaries_and_length() {
        assert!(kinds("a5c378").is_empty());
        assert!(kinds("xa5c3785").is_empty());
        assert!(kinds("a5c3785z").is_empty());
        assert!(kinds(&format!("{SHA}0")).is_empty());
        assert_eq!(kinds("1234567").len(), 1);
    }

    #[test]
    fn sha_comment_suffix() {
        let refs: Vec<Reference> = scan("a5c3785#L10").collect();
        assert_eq!(refs.len(), 1);
        assert!(refs[0].has_comment_suffix);

        let refs: Vec<Reference> = scan("a5c3785# end").collect();
        assert!(refs[0].has_comment_suffix);

        let refs: Vec<Reference> = scan("a5c3785#").collect();
        assert!(!refs[0].has_comment_suffix);
    }

    #[test]
    fn non_ascii_neighbours() {
        assert!(kinds("é#26").is_empty());
        assert_eq!(kinds("→ #26 ←").len(), 1);
    }

    #[test]
    fn matches_do_not_overlap() {
        let refs: Vec<Reference> = scan("@a @b #1 #2").collect();
        assert_eq!(refs.len(), 4);
        for pair in refs.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
        }
    }
}
