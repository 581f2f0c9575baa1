//! Rewrite coordinator: turns matched references and classified links into
//! replacement fragments.

use std::cell::OnceCell;
use std::fmt::Write as _;
use std::ops::Range;

use tracing::{debug, trace};

use crate::boundary::abbreviate_sha;
use crate::classify::classify;
use crate::error::Error;
use crate::matcher;
use crate::repository::RepositoryContextProvider;
use crate::types::{Inline, Page, ParsedGitHubLink, Reference, ReferenceKind, RepositoryContext};

/// Presentation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Wrap mention labels in strong emphasis.
    pub mention_strong: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        return Self { mention_strong: true };
    }
}

/// One piece of a rewritten text run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A link replacing the source text at `span`.
    Link {
        /// Visible label.
        label: Vec<Inline>,
        /// Byte range of the replaced text within the run.
        span: Range<usize>,
        /// Destination.
        url: String,
    },
    /// Unchanged source text.
    Text(String),
}

/// Applies the matcher and classifier to one document.
///
/// The repository context is requested the first time a match needs it and
/// reused for the rest of the document. A document without matches never
/// consults the provider.
pub struct Rewriter<'p> {
    /// Context resolved for this document.
    context: OnceCell<RepositoryContext>,
    /// Presentation options.
    options: RewriteOptions,
    /// Source of the repository context.
    provider: &'p dyn RepositoryContextProvider,
}

impl<'p> Rewriter<'p> {
    /// Create a rewriter for one document.
    pub fn new(provider: &'p dyn RepositoryContextProvider, options: RewriteOptions) -> Self {
        return Self { context: OnceCell::new(), options, provider };
    }

    /// Repository context, resolved on first use.
    ///
    /// # Errors
    ///
    /// Propagates the provider's failure, typically `Error::MissingRepositoryContext`.
    fn context(&self) -> Result<&RepositoryContext, Error> {
        if let Some(context) = self.context.get() {
            return Ok(context);
        }
        let resolved = self.provider.repository_context()?;
        debug!(user = %resolved.user, project = %resolved.project, base_url = %resolved.base_url, "repository context");
        return Ok(self.context.get_or_init(|| return resolved));
    }

    /// Split a text run into plain fragments and reference links.
    ///
    /// Returns `Ok(None)` when the run holds no reference. Otherwise the
    /// fragments cover the run without gaps: text fragments plus the spans of
    /// the link fragments reassemble the input.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingRepositoryContext` when a reference is found but
    /// no repository context is available.
    pub fn text(&self, text: &str) -> Result<Option<Vec<Fragment>>, Error> {
        let mut fragments = Vec::new();
        let mut cursor = 0;

        for reference in matcher::scan(text) {
            let context = self.context()?;
            if reference.span.start > cursor
                && let Some(before) = text.get(cursor..reference.span.start)
            {
                fragments.push(Fragment::Text(before.to_string()));
            }
            cursor = reference.span.end;
            trace!(marker = %reference.marker, kind = ?reference.kind, "reference");
            fragments.push(self.reference_link(&reference, context));
        }

        if fragments.is_empty() {
            return Ok(None);
        }
        if let Some(rest) = text.get(cursor..).filter(|rest| return !rest.is_empty()) {
            fragments.push(Fragment::Text(rest.to_string()));
        }
        return Ok(Some(fragments));
    }

    /// Shorten the label of a link that points at GitHub.
    ///
    /// Returns `Ok(None)` when the link does not classify, leaving it untouched.
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingRepositoryContext` when the link classifies but
    /// no repository context is available.
    pub fn link(&self, url: &str, label: &[Inline]) -> Result<Option<Vec<Inline>>, Error> {
        let Some(link) = classify(url, label) else {
            return Ok(None);
        };
        debug!(url, page = %link.page, "classified link");
        let context = self.context()?;
        return Ok(Some(short_label(&link, context)));
    }

    /// Build the link fragment for one reference.
    fn reference_link(&self, reference: &Reference, context: &RepositoryContext) -> Fragment {
        let user = reference.user.as_deref().unwrap_or(&context.user);
        let project = reference.project.as_deref().unwrap_or(&context.project);

        let (url, label) = match reference.kind {
            ReferenceKind::Mention => {
                let text = vec![Inline::Text(format!("@{user}"))];
                let label = if self.options.mention_strong { vec![Inline::Strong(text)] } else { text };
                (format!("{}{user}", context.base_url), label)
            },
            ReferenceKind::Sha | ReferenceKind::UserSha => {
                let mut label = Vec::new();
                if let Some(attribution) = attribution_prefix(reference) {
                    label.push(Inline::Text(format!("{attribution}@")));
                }
                label.push(Inline::Code(abbreviate_sha(&reference.value).to_string()));
                (destination(context, user, project, Page::Commit, &reference.value), label)
            },
            ReferenceKind::IssueOrPr | ReferenceKind::UserIssueOrPr => (
                destination(context, user, project, Page::Issues, &reference.value),
                vec![Inline::Text(reference.marker.clone())],
            ),
        };

        return Fragment::Link { label, span: reference.span.clone(), url };
    }
}

/// `user` or `user/project` as written before a SHA.
fn attribution_prefix(reference: &Reference) -> Option<String> {
    let user = reference.user.as_deref()?;
    return Some(match reference.project.as_deref() {
        Some(project) => format!("{user}/{project}"),
        None => user.to_string(),
    });
}

/// `base_url + user/project/page/reference`.
pub fn destination(context: &RepositoryContext, user: &str, project: &str, page: Page, reference: &str) -> String {
    return format!("{}{user}/{project}/{page}/{reference}", context.base_url);
}

/// Label of a classified link, relative to the repository context.
fn short_label(link: &ParsedGitHubLink, context: &RepositoryContext) -> Vec<Inline> {
    let base = if link.project != context.project {
        format!("{}/{}", link.user, link.project)
    } else if link.user == context.user {
        String::new()
    } else {
        link.user.clone()
    };
    let comment = if link.comment { " (comment)" } else { "" };

    if link.page != Page::Commit {
        return vec![Inline::Text(format!("{base}#{}{comment}", link.reference))];
    }

    let mut label = Vec::new();
    if !base.is_empty() {
        label.push(Inline::Text(format!("{base}@")));
    }
    label.push(Inline::Code(abbreviate_sha(&link.reference).to_string()));
    if link.comment {
        label.push(Inline::Text(comment.to_string()));
    }
    return label;
}

// ── Markdown rendering ────────────────────────────────────────────────

/// Render inline content as markdown.
pub fn render_inlines(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Code(code) => {
                let fence = if code.contains('`') { "``" } else { "`" };
                let _ = write!(out, "{fence}{code}{fence}");
            },
            Inline::Raw(raw) => out.push_str(raw),
            Inline::Strong(children) => {
                let _ = write!(out, "**{}**", render_inlines(children));
            },
            Inline::Text(text) => out.push_str(&escape_text(text)),
        }
    }
    return out;
}

/// Render a link as inline markdown.
pub fn render_link(label: &[Inline], url: &str) -> String {
    return format!("[{}]({url})", render_inlines(label));
}

/// Escape characters that would turn label text into markup.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '[' | ']' | '*' | '_' | '`' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    return out;
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
    use crate::repository::RepositorySource;

    const SHA: &str = "a5c3785ed8d6a35868bc169f07e40e889087fd2e";

    fn source(user: &str, project: &str) -> RepositorySource {
        return RepositorySource::Explicit(RepositoryContext::new(user, project));
    }

    fn rewrite(text: &str, provider: &RepositorySource) -> String {
        let rewriter = Rewriter::new(provider, RewriteOptions::default());
        let Some(fragments) = rewriter.text(text).unwrap() else {
            return text.to_string();
        };
        return fragments
            .iter()
            .map(|f| {
                return match f {
                    Fragment::Text(t) => t.clone(),
                    Fragment::Link { label, url, .. } => render_link(label, url),
                };
            })
            .collect();
    }

    #[test]
    fn sha_label_is_abbreviated_and_url_is_full() {
        let out = rewrite(&format!("Fixed in {SHA}"), &source("component", "emitter"));
        assert_eq!(out, format!("Fixed in [`a5c3785`](https://github.com/component/emitter/commit/{SHA})"));
    }

    #[test]
    fn user_sha_keeps_attribution() {
        let out = rewrite("test@12345678", &source("test", "remark-github"));
        assert_eq!(out, "[test@`1234567`](https://github.com/test/remark-github/commit/12345678)");
    }

    #[test]
    fn user_sha_defaults_project() {
        let out = rewrite(&format!("wooorm@{SHA}"), &source("component", "emitter"));
        assert_eq!(out, format!("[wooorm@`a5c3785`](https://github.com/wooorm/emitter/commit/{SHA})"));
    }

    #[test]
    fn issue_labels_are_literal() {
        let provider = source("component", "emitter");
        assert_eq!(rewrite("#26", &provider), "[#26](https://github.com/component/emitter/issues/26)");
        assert_eq!(rewrite("GH-26", &provider), "[GH-26](https://github.com/component/emitter/issues/26)");
        assert_eq!(rewrite("wooorm#26", &provider), "[wooorm#26](https://github.com/wooorm/emitter/issues/26)");
        assert_eq!(rewrite("#\"1\"", &provider), "[#\"1\"](https://github.com/component/emitter/issues/\"1\")");
    }

    #[test]
    fn mentions_are_strong_by_default() {
        let provider = source("wooorm", "remark");
        assert_eq!(rewrite("@wooorm", &provider), "[**@wooorm**](https://github.com/wooorm)");

        let rewriter = Rewriter::new(&provider, RewriteOptions { mention_strong: false });
        let fragments = rewriter.text("@wooorm").unwrap().unwrap();
        assert_eq!(
            fragments,
            vec![Fragment::Link {
                label: vec![Inline::Text("@wooorm".to_string())],
                span: 0..7,
                url: "https://github.com/wooorm".to_string(),
            }]
        );
    }

    #[test]
    fn fragments_are_lossless() {
        let text = format!("a @b c {SHA} d #1 e");
        let provider = source("x", "y");
        let rewriter = Rewriter::new(&provider, RewriteOptions::default());
        let fragments = rewriter.text(&text).unwrap().unwrap();
        let rebuilt: String = fragments
            .iter()
            .map(|f| {
                return match f {
                    Fragment::Text(t) => t.as_str(),
                    Fragment::Link { span, .. } => &text[span.clone()],
                };
            })
            .collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn base_url_is_used() {
        let provider = RepositorySource::Explicit(
            RepositoryContext::new("test", "remark-github").with_base_url("https://enteprise-github.xyz:443"),
        );
        assert_eq!(
            rewrite("test@12345678", &provider),
            "[test@`1234567`](https://enteprise-github.xyz:443/test/remark-github/commit/12345678)"
        );
    }

    #[test]
    fn missing_context_fails_only_when_needed() {
        let rewriter = Rewriter::new(&RepositorySource::Unavailable, RewriteOptions::default());
        assert_eq!(rewriter.text("nothing to see").unwrap(), None);
        assert!(matches!(rewriter.text("1234567"), Err(Error::MissingRepositoryContext { .. })));
    }

    #[test]
    fn classified_link_labels() {
        let provider = source("wooorm", "remark");
        let rewriter = Rewriter::new(&provider, RewriteOptions::default());
        let label = |url: &str| {
            let inlines = rewriter.link(url, &[Inline::Text(url.to_string())]).unwrap().unwrap();
            return render_inlines(&inlines);
        };

        assert_eq!(label(&format!("https://github.com/wooorm/remark/commit/{SHA}")), "`a5c3785`");
        assert_eq!(label(&format!("https://github.com/foo/remark/commit/{SHA}")), "foo@`a5c3785`");
        assert_eq!(label(&format!("https://github.com/foo/bar/commit/{SHA}#L1")), "foo/bar@`a5c3785` (comment)");
        assert_eq!(label("https://github.com/wooorm/remark/issues/26"), "#26");
        assert_eq!(label("https://github.com/foo/remark/pull/26"), "foo#26");
        assert_eq!(label("https://github.com/foo/bar/issues/26#issuecomment-1"), "foo/bar#26 (comment)");
    }

    #[test]
    fn unclassified_link_is_untouched() {
        let rewriter = Rewriter::new(&RepositorySource::Unavailable, RewriteOptions::default());
        let url = "https://github.com/wooorm/remark/issues/26";
        assert_eq!(rewriter.link(url, &[Inline::Text("bug".to_string())]).unwrap(), None);
    }
}
