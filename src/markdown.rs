//! Markdown host: walks a document, hands prose runs and links to a
//! [`Visitor`], and splices replacements back into the source.
//!
//! Only byte ranges that are replaced change; everything else in the
//! document is kept byte-for-byte.

use std::ops::Range;
use std::sync::LazyLock;

use pulldown_cmark::{Event, LinkType, Options, Parser, Tag};
use regex::Regex;
use tracing::trace;

use crate::classify::classify;
use crate::error::Error;
use crate::matcher;
use crate::rewrite::{Fragment, Rewriter, render_inlines, render_link};
use crate::types::{Inline, ParsedGitHubLink, Reference};

/// Bare URLs in prose, treated as links the way GFM autolink literals are.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static BARE_URL: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"https?://[^\s<>]+").expect("valid regex"));

/// A link as seen by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNode {
    /// Label content.
    pub label: Vec<Inline>,
    /// Source range of the label text, when it can be replaced in place.
    /// `None` means the whole link is replaced by an inline link.
    pub label_range: Option<Range<usize>>,
    /// Source range of the whole link.
    pub range: Range<usize>,
    /// Destination.
    pub url: String,
}

/// Callbacks for [`walk`], delivered in document order.
pub trait Visitor {
    /// A run of prose starting at byte `offset`. Its text equals the source slice.
    ///
    /// # Errors
    ///
    /// Implementations propagate hard failures; they abort the walk.
    fn text(&mut self, offset: usize, text: &str) -> Result<(), Error>;

    /// A link, including bare URLs found in prose.
    ///
    /// # Errors
    ///
    /// Implementations propagate hard failures; they abort the walk.
    fn link(&mut self, link: &LinkNode) -> Result<(), Error>;
}

/// Markdown extensions understood by the walker.
fn parser_options() -> Options {
    return Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
}

/// Walk `source`, skipping text inside code blocks, images, and links.
///
/// # Errors
///
/// Propagates the first error returned by the visitor.
pub fn walk<V: Visitor>(source: &str, visitor: &mut V) -> Result<(), Error> {
    let mut run: Option<Range<usize>> = None;
    let mut skip_depth = 0_usize;
    let mut link: Option<OpenLink> = None;

    for (event, range) in Parser::new_ext(source, parser_options()).into_offset_iter() {
        if let Some(open) = link.as_mut() {
            if matches!(event, Event::End(Tag::Link(..))) && open.nested == 0 {
                if let Some(open) = link.take() {
                    visitor.link(&open.finish())?;
                }
            } else {
                open.push(&event, range, source);
            }
            continue;
        }

        match event {
            Event::Start(Tag::Link(kind, url, _)) => {
                flush_run(source, &mut run, visitor)?;
                link = Some(OpenLink::new(kind, String::from(&*url), range));
            },
            Event::Start(Tag::CodeBlock(_) | Tag::Image(..)) => {
                flush_run(source, &mut run, visitor)?;
                skip_depth = skip_depth.saturating_add(1);
            },
            Event::End(Tag::CodeBlock(_) | Tag::Image(..)) => {
                flush_run(source, &mut run, visitor)?;
                skip_depth = skip_depth.saturating_sub(1);
            },
            Event::Text(text) if skip_depth == 0 && source.get(range.clone()) == Some(&*text) => {
                run = match run.take() {
                    Some(current) if current.end == range.start => Some(current.start..range.end),
                    Some(current) => {
                        flush_run(source, &mut Some(current), visitor)?;
                        Some(range)
                    },
                    None => Some(range),
                };
            },
            _ => flush_run(source, &mut run, visitor)?,
        }
    }

    return flush_run(source, &mut run, visitor);
}

/// Deliver the pending prose run, splitting out bare URLs as links.
///
/// # Errors
///
/// Propagates visitor errors.
fn flush_run<V: Visitor>(source: &str, run: &mut Option<Range<usize>>, visitor: &mut V) -> Result<(), Error> {
    let Some(range) = run.take() else {
        return Ok(());
    };
    let Some(text) = source.get(range.clone()) else {
        return Ok(());
    };

    let mut cursor = range.start;
    for found in BARE_URL.find_iter(text) {
        let url = trim_url(found.as_str());
        let start = range.start.saturating_add(found.start());
        let end = start.saturating_add(url.len());

        if start > cursor
            && let Some(before) = source.get(cursor..start)
        {
            visitor.text(cursor, before)?;
        }
        visitor.link(&LinkNode {
            label: vec![Inline::Text(url.to_string())],
            label_range: None,
            range: start..end,
            url: url.to_string(),
        })?;
        cursor = end;
    }

    if cursor < range.end
        && let Some(rest) = source.get(cursor..range.end)
    {
        visitor.text(cursor, rest)?;
    }
    return Ok(());
}

/// Drop trailing punctuation that ends the sentence rather than the URL.
fn trim_url(url: &str) -> &str {
    let mut url = url.trim_end_matches(['.', ',', ':', ';', '!', '?', '\'', '"', '*', '_', '~']);
    while url.ends_with(')') && url.matches(')').count() > url.matches('(').count() {
        url = url.strip_suffix(')').unwrap_or(url);
    }
    return url;
}

/// A link whose label is still being collected.
struct OpenLink {
    /// How the link was written.
    kind: LinkType,
    /// Label content collected so far.
    label: Vec<Inline>,
    /// Union of the label events' ranges.
    label_range: Option<Range<usize>>,
    /// Open tags inside the label whose content is kept raw.
    nested: usize,
    /// Whole link.
    range: Range<usize>,
    /// End of the last text event, to merge adjacent text.
    text_end: Option<usize>,
    /// Destination.
    url: String,
}

impl OpenLink {
    /// Start collecting a link.
    const fn new(kind: LinkType, url: String, range: Range<usize>) -> Self {
        return Self { kind, label: Vec::new(), label_range: None, nested: 0, range, text_end: None, url };
    }

    /// Add one label event.
    fn push(&mut self, event: &Event<'_>, range: Range<usize>, source: &str) {
        if self.nested > 0 {
            match event {
                Event::Start(_) => self.nested = self.nested.saturating_add(1),
                Event::End(_) => self.nested = self.nested.saturating_sub(1),
                _ => {},
            }
            return;
        }

        self.label_range = Some(match self.label_range.take() {
            Some(current) => current.start.min(range.start)..current.end.max(range.end),
            None => range.clone(),
        });

        match event {
            Event::Text(text) => {
                if self.text_end == Some(range.start)
                    && let Some(Inline::Text(last)) = self.label.last_mut()
                {
                    last.push_str(text);
                } else {
                    self.label.push(Inline::Text(String::from(&**text)));
                }
                self.text_end = Some(range.end);
                return;
            },
            Event::Code(code) => self.label.push(Inline::Code(String::from(&**code))),
            Event::Start(_) => {
                self.nested = 1;
                self.label.push(Inline::Raw(source.get(range).unwrap_or_default().to_string()));
            },
            _ => self.label.push(Inline::Raw(source.get(range).unwrap_or_default().to_string())),
        }
        self.text_end = None;
    }

    /// The finished node. Only inline and full reference links keep an
    /// in-place label range; shortcut and collapsed labels double as the
    /// reference key, and autolinks have no label syntax.
    fn finish(self) -> LinkNode {
        let label_range = match self.kind {
            LinkType::Inline | LinkType::Reference | LinkType::ReferenceUnknown => self.label_range,
            _ => None,
        };
        return LinkNode { label: self.label, label_range, range: self.range, url: self.url };
    }
}

// ── Rewriting ─────────────────────────────────────────────────────────

/// A pending replacement of a source range.
struct Edit {
    /// Replaced source range.
    range: Range<usize>,
    /// Markdown inserted in its place.
    replacement: String,
}

/// Visitor collecting edits from a [`Rewriter`].
struct RewriteVisitor<'r, 'p> {
    /// Replacements in document order.
    edits: Vec<Edit>,
    /// Coordinator for this document.
    rewriter: &'r Rewriter<'p>,
}

impl Visitor for RewriteVisitor<'_, '_> {
    fn text(&mut self, offset: usize, text: &str) -> Result<(), Error> {
        let Some(fragments) = self.rewriter.text(text)? else {
            return Ok(());
        };
        for fragment in fragments {
            if let Fragment::Link { label, span, url } = fragment {
                self.edits.push(Edit {
                    range: offset.saturating_add(span.start)..offset.saturating_add(span.end),
                    replacement: render_link(&label, &url),
                });
            }
        }
        return Ok(());
    }

    fn link(&mut self, link: &LinkNode) -> Result<(), Error> {
        let Some(label) = self.rewriter.link(&link.url, &link.label)? else {
            return Ok(());
        };
        let edit = match &link.label_range {
            Some(range) => Edit { range: range.clone(), replacement: render_inlines(&label) },
            None => Edit { range: link.range.clone(), replacement: render_link(&label, &link.url) },
        };
        self.edits.push(edit);
        return Ok(());
    }
}

/// Rewrite every reference and GitHub link in a markdown document.
///
/// # Errors
///
/// Returns `Error::MissingRepositoryContext` when the document needs a
/// repository context and none is available. The document is then left
/// entirely unchanged.
pub fn rewrite_markdown(source: &str, rewriter: &Rewriter<'_>) -> Result<String, Error> {
    let mut visitor = RewriteVisitor { edits: Vec::new(), rewriter };
    walk(source, &mut visitor)?;
    trace!(edits = visitor.edits.len(), "rewrite");
    return Ok(apply_edits(source, visitor.edits));
}

/// Splice non-overlapping edits into `source`.
fn apply_edits(source: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| return edit.range.start);

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.range.start < cursor {
            continue;
        }
        out.push_str(source.get(cursor..edit.range.start).unwrap_or_default());
        out.push_str(&edit.replacement);
        cursor = edit.range.end;
    }
    out.push_str(source.get(cursor..).unwrap_or_default());
    return out;
}

// ── Collection ────────────────────────────────────────────────────────

/// Something recognized in a document, with its byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Found {
    /// A link that classifies as a GitHub commit, issue, or pull request.
    Link {
        /// The decomposed link.
        link: ParsedGitHubLink,
        /// Source range of the whole link.
        range: Range<usize>,
    },
    /// A shorthand reference; its span is in document coordinates.
    Reference(Reference),
}

/// Visitor collecting matches without rewriting anything.
#[derive(Default)]
struct CollectVisitor {
    /// Matches in document order.
    found: Vec<Found>,
}

impl Visitor for CollectVisitor {
    fn text(&mut self, offset: usize, text: &str) -> Result<(), Error> {
        for mut reference in matcher::scan(text) {
            reference.span = offset.saturating_add(reference.span.start)..offset.saturating_add(reference.span.end);
            self.found.push(Found::Reference(reference));
        }
        return Ok(());
    }

    fn link(&mut self, link: &LinkNode) -> Result<(), Error> {
        if let Some(parsed) = classify(&link.url, &link.label) {
            self.found.push(Found::Link { link: parsed, range: link.range.clone() });
        }
        return Ok(());
    }
}

/// Every shorthand reference and classifiable GitHub link in `source`.
pub fn collect(source: &str) -> Vec<Found> {
    let mut visitor = CollectVisitor::default();
    // The collecting visitor never fails.
    let _ = walk(source, &mut visitor);
    return visitor.found;
}

/// One-based line number of a byte offset.
pub fn line_of(source: &str, offset: usize) -> usize {
    let before = source.get(..offset).unwrap_or(source);
    return before.matches('\n').count().saturating_add(1);
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
    use crate::rewrite::RewriteOptions;
    use crate::types::RepositoryContext;

    const SHA: &str = "a5c3785ed8d6a35868bc169f07e40e889087fd2e";

    fn github(source: &str) -> String {
        let provider = RepositorySource::Explicit(RepositoryContext::new("wooorm", "remark"));
        let rewriter = Rewriter::new(&provider, RewriteOptions::default());
        return rewrite_markdown(source, &rewriter).unwrap();
    }

    #[test]
    fn rewrites_list_of_references() {
        let input = format!(
            "-   SHA: {SHA}\n-   User@SHA: wooorm@{SHA}\n-   # Num: #26\n-   GH-Num: GH-26\n-   User#Num: wooorm#26\n"
        );
        let expected = format!(
            "-   SHA: [`a5c3785`](https://github.com/wooorm/remark/commit/{SHA})\n\
             -   User@SHA: [wooorm@`a5c3785`](https://github.com/wooorm/remark/commit/{SHA})\n\
             -   # Num: [#26](https://github.com/wooorm/remark/issues/26)\n\
             -   GH-Num: [GH-26](https://github.com/wooorm/remark/issues/26)\n\
             -   User#Num: [wooorm#26](https://github.com/wooorm/remark/issues/26)\n"
        );
        assert_eq!(github(&input), expected);
    }

    #[test]
    fn mention_in_paragraph() {
        assert_eq!(github("Thanks @wooorm!\n"), "Thanks [**@wooorm**](https://github.com/wooorm)!\n");
    }

    #[test]
    fn code_is_left_alone() {
        let input = "Use `#26` here.\n\n```\n#26 @wooorm\n```\n\n    indented #27\n";
        assert_eq!(github(input), input);
    }

    #[test]
    fn existing_links_keep_custom_labels() {
        let input = "[the bug](https://github.com/wooorm/remark/issues/26) and [#1](https://example.com)\n";
        assert_eq!(github(input), input);
    }

    #[test]
    fn github_link_labels_are_shortened() {
        let input = "See [https://github.com/wooorm/remark/issues/26](https://github.com/wooorm/remark/issues/26).\n";
        assert_eq!(github(input), "See [#26](https://github.com/wooorm/remark/issues/26).\n");
    }

    #[test]
    fn autolinks_become_inline_links() {
        let input = format!("See <https://github.com/foo/bar/commit/{SHA}>.\n");
        assert_eq!(github(&input), format!("See [foo/bar@`a5c3785`](https://github.com/foo/bar/commit/{SHA}).\n"));
    }

    #[test]
    fn bare_urls_are_links_not_shas() {
        let input = format!("At https://github.com/wooorm/remark/commit/{SHA}.\n");
        assert_eq!(github(&input), format!("At [`a5c3785`](https://github.com/wooorm/remark/commit/{SHA}).\n"));

        let other = format!("At https://example.com/{SHA} ok\n");
        assert_eq!(github(&other), other);
    }

    #[test]
    fn rewriting_is_idempotent() {
        let input = format!(
            "Fixed in {SHA} by @wooorm, see #26 and <https://github.com/foo/bar/issues/1#issuecomment-2>.\n"
        );
        let once = github(&input);
        assert_ne!(once, input);
        assert_eq!(github(&once), once);
    }

    #[test]
    fn text_without_references_is_byte_identical() {
        let input = "# Title\n\nSome *emphasis*, a [link](https://example.com) &amp; an entity.\n";
        assert_eq!(github(input), input);
    }

    #[test]
    fn missing_context_fails_whole_document() {
        let rewriter = Rewriter::new(&RepositorySource::Unavailable, RewriteOptions::default());
        let err = rewrite_markdown("Hello\n\n1234567\n", &rewriter).unwrap_err();
        assert!(matches!(err, Error::MissingRepositoryContext { .. }));
        assert_eq!(rewrite_markdown("Hello\n", &rewriter).unwrap(), "Hello\n");
    }

    #[test]
    fn collect_reports_document_offsets() {
        let source = "intro\n\nsee #26 and [https://github.com/a/b/pull/3](https://github.com/a/b/pull/3)\n";
        let found = collect(source);
        assert_eq!(found.len(), 2);
        let Found::Reference(reference) = &found[0] else {
            panic!("expected a reference first");
        };
        assert_eq!(&source[reference.span.clone()], "#26");
        assert_eq!(line_of(source, reference.span.start), 3);
        assert!(matches!(&found[1], Found::Link { link, .. } if link.reference == "3"));
    }

    #[test]
    fn trailing_punctuation_is_not_part_of_bare_urls() {
        assert_eq!(trim_url("https://github.com/a/b/issues/1)."), "https://github.com/a/b/issues/1");
        assert_eq!(trim_url("https://en.wikipedia.org/wiki/Foo_(bar)"), "https://en.wikipedia.org/wiki/Foo_(bar)");
    }
}
