use regex::Regex;
use shovel_common::{Result, ShovelError};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::parser::{HtmlParser, ScraperParser};
use crate::query::Query;

static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<script\b[^>]*>([\s\S]*?)</script>").expect("script pattern compiles")
});
static STYLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<style\b[^>]*>([\s\S]*?)</style>").expect("style pattern compiles")
});

/// Position of an element in its source markup: element-child indices from the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// Path of this node's `index`-th element child.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

/// Parser output for one element, before it is bound to its document.
///
/// Children are not included; they are produced on demand from `path`.
#[derive(Debug, Clone, Default)]
pub struct ElementParts {
    pub tag_name: String,
    pub inner_html: String,
    pub outer_html: String,
    pub text_content: String,
    pub own_text_content: String,
    pub attributes: HashMap<String, String>,
    pub path: NodePath,
}

/// Where an element came from, so its subtree can be queried again.
#[derive(Clone)]
pub(crate) struct Origin {
    pub(crate) source: Arc<str>,
    pub(crate) path: NodePath,
    pub(crate) parser: Arc<dyn HtmlParser>,
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Origin")
            .field("path", &self.path)
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

/// An HTML element. Immutable once produced by a parser.
#[derive(Debug, Clone)]
pub struct Element {
    tag_name: String,
    inner_html: String,
    outer_html: String,
    text_content: String,
    own_text_content: String,
    attributes: HashMap<String, String>,
    pub(crate) origin: Origin,
}

impl Element {
    pub(crate) fn bind(
        parts: ElementParts,
        source: &Arc<str>,
        parser: &Arc<dyn HtmlParser>,
    ) -> Self {
        Self {
            tag_name: parts.tag_name,
            inner_html: parts.inner_html,
            outer_html: parts.outer_html,
            text_content: parts.text_content,
            own_text_content: parts.own_text_content,
            attributes: parts.attributes,
            origin: Origin {
                source: Arc::clone(source),
                path: parts.path,
                parser: Arc::clone(parser),
            },
        }
    }

    /// Lower-cased tag name, e.g. `div`.
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    pub fn inner_html(&self) -> &str {
        &self.inner_html
    }

    /// Markup of the element including its own tags.
    pub fn outer_html(&self) -> &str {
        &self.outer_html
    }

    /// Text of the element and all its descendants, tags stripped.
    pub fn text_content(&self) -> &str {
        &self.text_content
    }

    /// Text directly inside this element, excluding descendant elements' text.
    pub fn own_text_content(&self) -> &str {
        &self.own_text_content
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    /// Element children in document order, built from the source on each call.
    pub fn children(&self) -> Vec<Element> {
        let origin = &self.origin;
        match origin.parser.children(&origin.source, &origin.path) {
            Ok(found) => found
                .into_iter()
                .map(|parts| Self::bind(parts, &origin.source, &origin.parser))
                .collect(),
            Err(err) => {
                tracing::warn!(path = ?origin.path, error = %err, "dom.element.children_failed");
                Vec::new()
            }
        }
    }

    pub fn path(&self) -> &NodePath {
        &self.origin.path
    }

    /// Value of an attribute, if present.
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.attributes.get(attribute).map(String::as_str)
    }

    pub fn id(&self) -> Option<&str> {
        self.get("id")
    }

    /// Class names split on whitespace; empty when there is no `class` attribute.
    pub fn classes(&self) -> Vec<&str> {
        self.get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Inline CSS from the `style` attribute.
    pub fn style(&self) -> Option<&str> {
        self.get("style")
    }
}

/// Compares materialized fields; equal `outer_html` already implies equal children.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.tag_name == other.tag_name
            && self.inner_html == other.inner_html
            && self.outer_html == other.outer_html
            && self.text_content == other.text_content
            && self.own_text_content == other.own_text_content
            && self.attributes == other.attributes
    }
}

/// An HTML document: the URL it was fetched from and its raw markup.
#[derive(Clone)]
pub struct Document {
    url: String,
    html: Arc<str>,
    pub(crate) parser: Arc<dyn HtmlParser>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.url)
            .field("html_len", &self.html.len())
            .field("parser", &self.parser)
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.html == other.html
    }
}

impl Document {
    /// A document queried through [`ScraperParser`].
    pub fn new(url: impl Into<String>, html: impl Into<Arc<str>>) -> Self {
        Self::with_parser(url, html, Arc::new(ScraperParser))
    }

    pub fn with_parser(
        url: impl Into<String>,
        html: impl Into<Arc<str>>,
        parser: Arc<dyn HtmlParser>,
    ) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            parser,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub(crate) fn source(&self) -> &Arc<str> {
        &self.html
    }

    pub fn body(&self) -> Result<Element> {
        self.query_selector("body")
            .ok_or(ShovelError::IllegalDocumentStructure("body"))
    }

    pub fn head(&self) -> Result<Element> {
        self.query_selector("head")
            .ok_or(ShovelError::IllegalDocumentStructure("head"))
    }

    /// Untrimmed text of the first `title`. See [`crate::meta::title`] for the lenient form.
    pub fn title(&self) -> Result<String> {
        self.query_selector("title")
            .map(|t| t.text_content)
            .ok_or(ShovelError::IllegalDocumentStructure("title"))
    }

    /// Body markup with `<script>` and `<style>` blocks cut out.
    ///
    /// One non-recursive pass per tag; nested or malformed blocks are left as
    /// the regex finds them. Not a sanitizer.
    pub fn body_elements(&self) -> Result<String> {
        let body = self.body()?;
        let mut html = body.inner_html;
        for re in [&*SCRIPT_BLOCK, &*STYLE_BLOCK] {
            html = re.replace_all(&html, "").into_owned();
        }
        Ok(html)
    }

    /// Every `meta` tag grouped by `name` (else `property`), all non-empty
    /// `content` values kept in document order.
    ///
    /// Keys are the attribute value as written: `<meta property="og:title">`
    /// groups under `og:title`, not `title`. [`crate::meta::open_graph`] is the
    /// prefix-stripped view.
    pub fn metadata(&self) -> HashMap<String, Vec<String>> {
        group_non_empty(
            self.query_selector_all("meta").iter().map(|el| {
                let key = el.get("name").or_else(|| el.get("property")).unwrap_or("");
                (key, el.get("content").unwrap_or(""))
            }),
        )
    }

    /// Every `link` tag grouped by `rel`, all non-empty `href` values kept in document order.
    pub fn link_tags(&self) -> HashMap<String, Vec<String>> {
        group_non_empty(self.query_selector_all("link").iter().map(|el| {
            (el.get("rel").unwrap_or(""), el.get("href").unwrap_or(""))
        }))
    }
}

fn group_non_empty<'a>(
    pairs: impl Iterator<Item = (&'a str, &'a str)>,
) -> HashMap<String, Vec<String>> {
    let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
    for (key, value) in pairs {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        grouped.entry(key.to_string()).or_default().push(value.to_string());
    }
    grouped
}
