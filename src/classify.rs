//! Classify links that point at GitHub commits, issues, and pull requests.

use crate::boundary::{issue_end, sha_end, username_end};
use crate::types::{Inline, Page, ParsedGitHubLink};

/// Web prefix every classifiable link starts with.
pub const GITHUB_URL_PREFIX: &str = "https://github.com/";

/// Decompose `url` into user, project, page, and reference.
///
/// Only links whose label is a single plain-text run that itself starts with
/// the GitHub prefix are classified, so custom link text is never touched.
/// Any shape outside `https://github.com/<user>/<project>/{commit,issues,pull}/<ref>`
/// is `None`.
pub fn classify(url: &str, label: &[Inline]) -> Option<ParsedGitHubLink> {
    let [Inline::Text(text)] = label else {
        return None;
    };
    if !url.starts_with(GITHUB_URL_PREFIX) || !text.starts_with(GITHUB_URL_PREFIX) {
        return None;
    }

    let user_start = GITHUB_URL_PREFIX.len();
    let user_end = segment_end(url, user_start)?;

    let project_start = user_end.saturating_add(1);
    let project_end = segment_end(url, project_start)?;

    let page_start = project_end.saturating_add(1);
    let page_end = url
        .get(page_start..)?
        .find('/')
        .map(|offset| return page_start.saturating_add(offset))?;
    let page = Page::from_segment(url.get(page_start..page_end)?)?;

    let reference_start = page_end.saturating_add(1);
    let reference_end = match page {
        Page::Commit => sha_end(url, reference_start, true),
        Page::Issues | Page::Pull => issue_end(url, reference_start),
    }?;

    let comment = url.as_bytes().get(reference_end) == Some(&b'#') && url.len() > reference_end.saturating_add(1);

    return Some(ParsedGitHubLink {
        comment,
        page,
        project: url.get(project_start..project_end)?.to_string(),
        reference: url.get(reference_start..reference_end)?.to_string(),
        user: url.get(user_start..user_end)?.to_string(),
    });
}

/// End of a login-shaped path segment that must be followed by `/`.
fn segment_end(url: &str, start: usize) -> Option<usize> {
    let end = username_end(url, start)?;
    return (url.as_bytes().get(end) == Some(&b'/')).then_some(end);
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

    fn plain(url: &str) -> Vec<Inline> {
        return vec![Inline::Text(url.to_string())];
    }

    fn classify_plain(url: &str) -> Option<ParsedGitHubLink> {
        return classify(url, &plain(url));
    }

    #[test]
    fn commit_link() {
        let url = "https://github.com/wooorm/remark/commit/a5c3785ed8d6a35868bc169f07e40e889087fd2e";
        let link = classify_plain(url).unwrap();
        assert_eq!(link.user, "wooorm");
        assert_eq!(link.project, "remark");
        assert_eq!(link.page, Page::Commit);
        assert_eq!(link.reference, "a5c3785ed8d6a35868bc169f07e40e889087fd2e");
        assert!(!link.comment);
    }

    #[test]
    fn issue_and_pull_links() {
        let issue = classify_plain("https://github.com/wooorm/remark/issues/26").unwrap();
        assert_eq!(issue.page, Page::Issues);
        assert_eq!(issue.reference, "26");

        let pull = classify_plain("https://github.com/wooorm/remark/pull/180").unwrap();
        assert_eq!(pull.page, Page::Pull);
        assert_eq!(pull.reference, "180");
    }

    #[test]
    fn comment_fragment_needs_content() {
        let with = classify_plain("https://github.com/wooorm/remark/issues/26#issuecomment-1").unwrap();
        assert!(with.comment);

        let bare = classify_plain("https://github.com/wooorm/remark/issues/26#").unwrap();
        assert!(!bare.comment);
    }

    #[test]
    fn unknown_page_is_not_a_reference() {
        assert_eq!(classify_plain("https://github.com/wooorm/remark/blob/main/readme.md"), None);
        assert_eq!(classify_plain("https://github.com/wooorm/remark/wiki/Home"), None);
        assert_eq!(classify_plain("https://github.com/wooorm/remark"), None);
    }

    #[test]
    fn other_hosts_are_ignored() {
        assert_eq!(classify_plain("https://gitlab.com/wooorm/remark/issues/1"), None);
        assert_eq!(classify_plain("http://github.com/wooorm/remark/issues/1"), None);
    }

    #[test]
    fn custom_label_is_left_alone() {
        let url = "https://github.com/wooorm/remark/issues/26";
        assert_eq!(classify(url, &[Inline::Text("the bug".to_string())]), None);
        assert_eq!(classify(url, &[Inline::Strong(plain(url))]), None);
        assert_eq!(classify(url, &[]), None);
    }

    #[test]
    fn invalid_login_segments() {
        assert_eq!(classify_plain("https://github.com/-wooorm/remark/issues/1"), None);
        assert_eq!(classify_plain("https://github.com/wooorm/remark.js/issues/1"), None);
        assert_eq!(classify_plain("https://github.com//remark/issues/1"), None);
    }

    #[test]
    fn missing_reference() {
        assert_eq!(classify_plain("https://github.com/wooorm/remark/issues/"), None);
        assert_eq!(classify_plain("https://github.com/wooorm/remark/commit/XYZ"), None);
    }
}
