use shovel_common::{Result, ShovelError};

use crate::model::Element;
use crate::query::Query;

/// Run a caller function over the result of a query.
///
/// The plural forms always call `f`, possibly with an empty list. The singular
/// forms need a match and fail with `ElementNotFound` otherwise.
pub trait Transform: Query {
    fn transform_query_selector_all<R, F>(&self, selector: &str, f: F) -> R
    where
        F: FnOnce(Vec<Element>) -> R,
    {
        f(self.query_selector_all(selector))
    }

    fn transform_query_selector<R, F>(&self, selector: &str, f: F) -> Result<R>
    where
        F: FnOnce(Element) -> R,
    {
        let element = self
            .query_selector(selector)
            .ok_or_else(|| ShovelError::ElementNotFound(selector.to_string()))?;
        Ok(f(element))
    }

    fn transform_class_name<R, F>(&self, class_name: &str, f: F) -> R
    where
        F: FnOnce(Vec<Element>) -> R,
    {
        f(self.get_elements_by_class_name(class_name))
    }

    fn transform_id<R, F>(&self, id: &str, f: F) -> Result<R>
    where
        F: FnOnce(Element) -> R,
    {
        let element = self
            .get_element_by_id(id)
            .ok_or_else(|| ShovelError::ElementNotFound(format!("#{id}")))?;
        Ok(f(element))
    }
}

impl<T: Query + ?Sized> Transform for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    #[derive(Debug, PartialEq)]
    struct Product {
        name: String,
        price: String,
    }

    fn shop() -> Document {
        Document::new(
            "https://shop.example/",
            r#"<html><body>
<div id="featured" class="product"><h3>Lamp</h3><span class="price">12</span></div>
<div class="product"><h3>Desk</h3><span class="price">90</span></div>
</body></html>"#,
        )
    }

    fn product(el: Element) -> Product {
        let field = |sel: &str| {
            el.query_selector(sel)
                .map(|e| e.text_content().to_string())
                .unwrap_or_default()
        };
        Product {
            name: field("h3"),
            price: field(".price"),
        }
    }

    #[test]
    fn id_transform_builds_a_value() {
        let featured = shop().transform_id("featured", product).unwrap();
        assert_eq!(
            featured,
            Product {
                name: "Lamp".into(),
                price: "12".into()
            }
        );
    }

    #[test]
    fn class_transform_sees_every_match() {
        let names = shop().transform_class_name("product", |els| {
            els.into_iter().map(product).map(|p| p.name).collect::<Vec<_>>()
        });
        assert_eq!(names, ["Lamp", "Desk"]);
    }

    #[test]
    fn plural_transforms_receive_empty_lists() {
        let count = shop().transform_query_selector_all("table", |els| els.len());
        assert_eq!(count, 0);
        assert!(shop().transform_class_name("missing", |els| els.is_empty()));
    }

    #[test]
    fn singular_transforms_require_a_match() {
        let err = shop()
            .transform_query_selector("table", |el| el.tag_name().to_string())
            .unwrap_err();
        assert!(matches!(err, ShovelError::ElementNotFound(ref s) if s == "table"));

        let err = shop().transform_id("nope", |_| ()).unwrap_err();
        assert!(matches!(err, ShovelError::ElementNotFound(_)));
    }

    #[test]
    fn element_scoped_transform() {
        let doc = shop();
        let featured = doc.get_element_by_id("featured").unwrap();
        let price = featured
            .transform_query_selector(".price", |el| el.text_content().to_string())
            .unwrap();
        assert_eq!(price, "12");
    }
}
