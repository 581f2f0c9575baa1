/// Core domain types for shorthand references, classified links, and repository context.
use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// Which shorthand form a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Bare `#N`, `#"N"`, or `GH-N`.
    IssueOrPr,
    /// `@user`.
    Mention,
    /// Bare hex run such as `a5c3785`.
    Sha,
    /// `user#N` or `user/project#N`.
    UserIssueOrPr,
    /// `user@sha` or `user/project@sha`.
    UserSha,
}

impl ReferenceKind {
    /// Snake-case name used in reports.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::IssueOrPr => "issue_or_pr",
            Self::Mention => "mention",
            Self::Sha => "sha",
            Self::UserIssueOrPr => "user_issue_or_pr",
            Self::UserSha => "user_sha",
        };
    }
}

/// A shorthand mention recognized in a text run.
/// Spans are byte offsets into the text that was scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Trailing `#` plus content directly after a SHA.
    pub has_comment_suffix: bool,
    /// Shorthand form that matched.
    pub kind: ReferenceKind,
    /// Exact source text of the match, e.g. `GH-26` or `wooorm#26`.
    pub marker: String,
    /// Explicit project, when written as `user/project…`.
    pub project: Option<String>,
    /// Byte range of the match in the scanned text.
    pub span: Range<usize>,
    /// Explicit user, or the mentioned login for mentions.
    pub user: Option<String>,
    /// SHA or issue number as written, quotes included for `#"26"`.
    pub value: String,
}

/// GitHub page kinds the classifier understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// `/commit/<sha>`.
    Commit,
    /// `/issues/<n>`.
    Issues,
    /// `/pull/<n>`.
    Pull,
}

impl Page {
    /// The URL path segment for this page.
    pub const fn as_segment(self) -> &'static str {
        return match self {
            Self::Commit => "commit",
            Self::Issues => "issues",
            Self::Pull => "pull",
        };
    }

    /// Parse a URL path segment. Anything but the three known pages is `None`.
    pub fn from_segment(segment: &str) -> Option<Self> {
        return match segment {
            "commit" => Some(Self::Commit),
            "issues" => Some(Self::Issues),
            "pull" => Some(Self::Pull),
            _ => None,
        };
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(self.as_segment());
    }
}

/// Decomposition of a link whose destination and label both point at GitHub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGitHubLink {
    /// The URL carries a non-empty `#fragment` after the reference.
    pub comment: bool,
    /// Page kind from the path.
    pub page: Page,
    /// Project (repository) name.
    pub project: String,
    /// SHA for commits, number for issues and pulls.
    pub reference: String,
    /// Owner login.
    pub user: String,
}

/// The ambient `{user, project, base_url}` completing references that omit them.
/// `base_url` always ends with `/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryContext {
    /// Web root links are built under, e.g. `https://github.com/`.
    pub base_url: String,
    /// Default project.
    pub project: String,
    /// Default owner.
    pub user: String,
}

impl RepositoryContext {
    /// Default web root for github.com.
    pub const GITHUB_BASE_URL: &'static str = "https://github.com/";

    /// Build a context on github.com.
    pub fn new(user: impl Into<String>, project: impl Into<String>) -> Self {
        return Self {
            base_url: Self::GITHUB_BASE_URL.to_string(),
            project: project.into(),
            user: user.into(),
        };
    }

    /// Replace the base URL, appending the trailing `/` when missing.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        return self;
    }
}

/// Inline content of a link label, as seen by the host document or produced
/// by the rewrite coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Code span.
    Code(String),
    /// Any other inline markup, kept as raw source.
    Raw(String),
    /// Strong emphasis wrapping further inlines.
    Strong(Vec<Inline>),
    /// Plain text.
    Text(String),
}
