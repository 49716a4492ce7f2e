use scraper::{ElementRef, Html, Selector};
use shovel_common::{Result, ShovelError};
use std::fmt;

use crate::model::{ElementParts, NodePath};

/// Parses markup and evaluates CSS selectors against it.
///
/// Implementations must support at least tag, `#id`, `.class`, `[attr]`,
/// `[attr=value]`, `[attr^=value]`, the descendant combinator and comma
/// separated selector lists. Results come back in document order, and the
/// same `source` must always parse to the same tree so that a [`NodePath`]
/// handed out by one call resolves to the same element in the next.
pub trait HtmlParser: Send + Sync + fmt::Debug {
    /// Match `selector` against the document parsed from `source`.
    ///
    /// With `scope`, only descendants of the element at that path are
    /// candidates; the scoped element itself never matches. A scope that no
    /// longer resolves yields no matches.
    fn select(
        &self,
        source: &str,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> Result<Vec<ElementParts>>;

    /// First match in document order, without building the rest.
    fn select_first(
        &self,
        source: &str,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> Result<Option<ElementParts>> {
        Ok(self.select(source, scope, selector)?.into_iter().next())
    }

    /// Element children of the element at `path`, in document order.
    fn children(&self, source: &str, path: &NodePath) -> Result<Vec<ElementParts>> {
        let depth = path.indices().len() + 1;
        Ok(self
            .select(source, Some(path), "*")?
            .into_iter()
            .filter(|parts| parts.path.indices().len() == depth)
            .collect())
    }
}

/// [`HtmlParser`] backed by `scraper` (html5ever + selectors).
#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperParser;

impl HtmlParser for ScraperParser {
    fn select(
        &self,
        source: &str,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> Result<Vec<ElementParts>> {
        let compiled = compile(selector)?;
        let html = Html::parse_document(source);

        let matches: Vec<ElementRef<'_>> = match scope {
            None => html.select(&compiled).collect(),
            Some(path) => match locate(&html, path) {
                Some(root) => root.select(&compiled).collect(),
                None => Vec::new(),
            },
        };

        Ok(matches
            .into_iter()
            .map(|el| convert(el, path_of(el)))
            .collect())
    }

    fn select_first(
        &self,
        source: &str,
        scope: Option<&NodePath>,
        selector: &str,
    ) -> Result<Option<ElementParts>> {
        let compiled = compile(selector)?;
        let html = Html::parse_document(source);

        let first = match scope {
            None => html.select(&compiled).next(),
            Some(path) => locate(&html, path).and_then(|root| root.select(&compiled).next()),
        };
        Ok(first.map(|el| convert(el, path_of(el))))
    }

    fn children(&self, source: &str, path: &NodePath) -> Result<Vec<ElementParts>> {
        let html = Html::parse_document(source);
        let Some(parent) = locate(&html, path) else {
            return Ok(Vec::new());
        };
        Ok(parent
            .children()
            .filter_map(ElementRef::wrap)
            .enumerate()
            .map(|(i, child)| convert(child, path.child(i)))
            .collect())
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ShovelError::InvalidSelector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn locate<'a>(html: &'a Html, path: &NodePath) -> Option<ElementRef<'a>> {
    let mut node = html.tree.root();
    for &index in path.indices() {
        node = node
            .children()
            .filter(|c| c.value().is_element())
            .nth(index)?;
    }
    ElementRef::wrap(node)
}

fn path_of(el: ElementRef<'_>) -> NodePath {
    let mut indices = Vec::new();
    let mut node = *el;
    while let Some(parent) = node.parent() {
        let index = parent
            .children()
            .filter(|c| c.value().is_element())
            .position(|c| c.id() == node.id())
            .unwrap_or_default();
        indices.push(index);
        node = parent;
    }
    indices.reverse();
    NodePath::new(indices)
}

/// Materializes one element. Descendants are reached later through the path.
fn convert(el: ElementRef<'_>, path: NodePath) -> ElementParts {
    let own_text_content = el
        .children()
        .filter_map(|c| c.value().as_text())
        .map(|t| &**t)
        .collect();

    ElementParts {
        tag_name: el.value().name().to_ascii_lowercase(),
        inner_html: el.inner_html(),
        outer_html: el.html(),
        text_content: el.text().collect(),
        own_text_content,
        attributes: el
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str =
        "<html><head></head><body><ul><li>a</li><li>b<em>!</em></li></ul><p>x</p></body></html>";

    fn nested(depth: usize) -> String {
        format!(
            "<html><body>{}<b id=\"leaf\">x</b>{}</body></html>",
            "<div>".repeat(depth),
            "</div>".repeat(depth)
        )
    }

    #[test]
    fn paths_resolve_back_to_the_same_element() {
        let found = ScraperParser.select(PAGE, None, "em").unwrap();
        assert_eq!(found.len(), 1);
        // html(0) > body(1) > ul(0) > li(1) > em(0)
        assert_eq!(found[0].path.indices(), &[0, 1, 0, 1, 0]);

        let html = Html::parse_document(PAGE);
        let el = locate(&html, &found[0].path).unwrap();
        assert_eq!(el.value().name(), "em");
    }

    #[test]
    fn children_carry_extended_paths() {
        let ul = ScraperParser.select(PAGE, None, "ul").unwrap().remove(0);
        let children = ScraperParser.children(PAGE, &ul.path).unwrap();
        let child_paths: Vec<_> = children.iter().map(|c| c.path.clone()).collect();
        assert_eq!(child_paths, [ul.path.child(0), ul.path.child(1)]);
        assert_eq!(children[1].text_content, "b!");
    }

    #[test]
    fn first_match_agrees_with_the_full_list() {
        let li = ScraperParser.select(PAGE, None, "li").unwrap().remove(1);
        let first = ScraperParser.select_first(PAGE, None, "li:last-child").unwrap();
        assert_eq!(first.map(|p| p.path), Some(li.path.clone()));
        assert!(ScraperParser.select_first(PAGE, Some(&li.path), "p").unwrap().is_none());
        assert!(ScraperParser.select_first(PAGE, None, "p[").is_err());
    }

    #[test]
    fn deeply_nested_markup_is_walked_without_recursion() {
        let page = nested(5_000);
        let html = ScraperParser.select_first(&page, None, "html").unwrap().unwrap();
        assert_eq!(html.text_content, "x");

        let leaf = ScraperParser.select_first(&page, None, "#leaf").unwrap().unwrap();
        assert_eq!(leaf.path.indices().len(), 5_003);

        let body = NodePath::new(vec![0, 1]);
        let top = ScraperParser.children(&page, &body).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].tag_name, "div");
    }

    #[test]
    fn default_children_filter_to_direct_descendants() {
        #[derive(Debug)]
        struct SelectOnly;
        impl HtmlParser for SelectOnly {
            fn select(
                &self,
                source: &str,
                scope: Option<&NodePath>,
                selector: &str,
            ) -> Result<Vec<ElementParts>> {
                ScraperParser.select(source, scope, selector)
            }
        }

        let ul = ScraperParser.select(PAGE, None, "ul").unwrap().remove(0);
        let tags: Vec<_> = SelectOnly
            .children(PAGE, &ul.path)
            .unwrap()
            .into_iter()
            .map(|c| c.tag_name)
            .collect();
        assert_eq!(tags, ["li", "li"]);
    }

    #[test]
    fn scope_excludes_the_scoped_element() {
        let li = ScraperParser.select(PAGE, None, "li").unwrap().remove(1);
        let inside = ScraperParser.select(PAGE, Some(&li.path), "li, em").unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].tag_name, "em");
    }

    #[test]
    fn stale_scope_matches_nothing() {
        let bogus = NodePath::new(vec![0, 9, 9]);
        assert!(ScraperParser.select(PAGE, Some(&bogus), "*").unwrap().is_empty());
    }

    #[test]
    fn bad_selector_is_reported() {
        let err = ScraperParser.select(PAGE, None, "p[").unwrap_err();
        assert!(matches!(err, ShovelError::InvalidSelector { .. }));
    }
}
