use shovel_common::Result;

use crate::model::{Document, Element};

/// Selector-based navigation over a [`Document`] or an [`Element`] subtree.
///
/// A document searches its whole tree (the `html` element included); an
/// element searches its descendants only. Everything is derived from
/// [`try_query_selector_all`](Query::try_query_selector_all).
pub trait Query {
    /// All matches in document order, or `InvalidSelector` if the selector does not parse.
    fn try_query_selector_all(&self, selector: &str) -> Result<Vec<Element>>;

    /// First match only. Implementors should stop at the first hit.
    fn try_query_selector(&self, selector: &str) -> Result<Option<Element>> {
        Ok(self.try_query_selector_all(selector)?.into_iter().next())
    }

    /// All matches in document order; empty on no match or an unparsable selector.
    fn query_selector_all(&self, selector: &str) -> Vec<Element> {
        match self.try_query_selector_all(selector) {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(selector, error=%err, "dom.query.invalid_selector");
                Vec::new()
            }
        }
    }

    fn query_selector(&self, selector: &str) -> Option<Element> {
        self.try_query_selector(selector).unwrap_or_else(|err| {
            tracing::warn!(selector, error=%err, "dom.query.invalid_selector");
            None
        })
    }

    /// First match, in document order, that satisfies `filter`.
    fn query_selector_where<F>(&self, selector: &str, mut filter: F) -> Option<Element>
    where
        F: FnMut(&Element) -> bool,
    {
        self.query_selector_all(selector)
            .into_iter()
            .find(|el| filter(el))
    }

    fn get_element_by_id(&self, id: &str) -> Option<Element> {
        self.query_selector(&format!("#{id}"))
    }

    fn get_elements_by_class_name(&self, class_name: &str) -> Vec<Element> {
        self.query_selector_all(&format!(".{class_name}"))
    }

    /// `value` of `input[name=<name>]`, falling back to its `checked` attribute.
    fn input_value(&self, name: &str) -> Option<String> {
        let input = self.query_selector(&format!("input[name={name}]"))?;
        input
            .get("value")
            .or_else(|| input.get("checked"))
            .map(str::to_string)
    }
}

impl Query for Document {
    fn try_query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        let found = self.parser.select(self.html(), None, selector)?;
        Ok(found
            .into_iter()
            .map(|parts| Element::bind(parts, self.source(), &self.parser))
            .collect())
    }

    fn try_query_selector(&self, selector: &str) -> Result<Option<Element>> {
        let found = self.parser.select_first(self.html(), None, selector)?;
        Ok(found.map(|parts| Element::bind(parts, self.source(), &self.parser)))
    }
}

impl Query for Element {
    fn try_query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        let origin = &self.origin;
        let found = origin
            .parser
            .select(&origin.source, Some(&origin.path), selector)?;
        Ok(found
            .into_iter()
            .map(|parts| Element::bind(parts, &origin.source, &origin.parser))
            .collect())
    }

    fn try_query_selector(&self, selector: &str) -> Result<Option<Element>> {
        let origin = &self.origin;
        let found = origin
            .parser
            .select_first(&origin.source, Some(&origin.path), selector)?;
        Ok(found.map(|parts| Element::bind(parts, &origin.source, &origin.parser)))
    }
}
