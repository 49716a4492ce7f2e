//! Metadata extraction: page-level facts read through [`Query`].
//!
//! Every function here is pure and total over a [`Document`]; only
//! [`body_text`] and [`main_text`] can fail, when the page has no `body`.
//!
//! Two aggregation policies coexist on purpose. [`open_graph`],
//! [`twitter_card`] and [`meta_tags`] build single-valued maps where the last
//! matching element wins, while [`Document::metadata`] and
//! [`Document::link_tags`] keep every value per key.

use shovel_common::Result;
use std::collections::HashMap;

use crate::model::{Document, Element};
use crate::query::Query;

/// Relations tried, in order, by [`favicon_url`].
const FAVICON_RELS: [&str; 4] = [
    "icon",
    "shortcut icon",
    "apple-touch-icon",
    "apple-touch-icon-precomposed",
];

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn attr_of_first(doc: &Document, selector: &str, attribute: &str) -> Option<String> {
    trimmed(doc.query_selector(selector)?.get(attribute))
}

fn collect_attr(doc: &Document, selector: &str, attribute: &str) -> Vec<String> {
    doc.query_selector_all(selector)
        .iter()
        .filter_map(|el| trimmed(el.get(attribute)))
        .collect()
}

/// `html[lang]`, else the `Content-Language` meta tag.
pub fn language(doc: &Document) -> Option<String> {
    attr_of_first(doc, "html", "lang")
        .or_else(|| attr_of_first(doc, "meta[http-equiv='Content-Language']", "content"))
}

/// [`language`] split on commas, e.g. `"en-US, fr"` gives `["en-US", "fr"]`.
pub fn language_codes(doc: &Document) -> Vec<String> {
    language(doc)
        .map(|lang| {
            lang.split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub fn title(doc: &Document) -> Option<String> {
    doc.query_selector("title")
        .map(|t| t.text_content().trim().to_string())
}

pub fn description(doc: &Document) -> Option<String> {
    attr_of_first(doc, "meta[name='description']", "content")
}

pub fn canonical_url(doc: &Document) -> Option<String> {
    attr_of_first(doc, "link[rel='canonical']", "href")
}

pub fn viewport(doc: &Document) -> Option<String> {
    attr_of_first(doc, "meta[name='viewport']", "content")
}

/// `<meta charset>`, else the `charset=` parameter of a `Content-Type` http-equiv tag.
pub fn charset(doc: &Document) -> Option<String> {
    if let Some(cs) = attr_of_first(doc, "meta[charset]", "charset") {
        return Some(cs);
    }
    let content_type = doc.query_selector_where("meta[http-equiv]", |el| {
        el.get("http-equiv")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("Content-Type"))
    })?;
    let content = content_type.get("content")?;
    let at = content.to_ascii_lowercase().find("charset=")?;
    trimmed(Some(&content[at + "charset=".len()..]))
}

fn prefixed_map(
    doc: &Document,
    selector: &str,
    key_attr: &str,
    prefix: &str,
) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for el in doc.query_selector_all(selector) {
        let Some(key) = el.get(key_attr).and_then(|k| k.strip_prefix(prefix)) else {
            continue;
        };
        let Some(content) = el.get("content") else {
            continue;
        };
        map.insert(key.trim().to_string(), content.trim().to_string());
    }
    map
}

/// `og:*` properties keyed by the part after `og:`; the last tag for a key wins.
pub fn open_graph(doc: &Document) -> HashMap<String, String> {
    prefixed_map(doc, "meta[property^='og:']", "property", "og:")
}

/// `twitter:*` names keyed by the part after `twitter:`; the last tag for a key wins.
pub fn twitter_card(doc: &Document) -> HashMap<String, String> {
    prefixed_map(doc, "meta[name^='twitter:']", "name", "twitter:")
}

/// Every `meta` tag keyed by `name` (else `property`); the last tag for a key wins.
pub fn meta_tags(doc: &Document) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for el in doc.query_selector_all("meta") {
        let Some(key) = el.get("name").or_else(|| el.get("property")) else {
            continue;
        };
        let Some(content) = el.get("content") else {
            continue;
        };
        map.insert(key.trim().to_string(), content.trim().to_string());
    }
    map
}

pub fn icon_links(doc: &Document) -> Vec<String> {
    collect_attr(doc, "link[rel='icon'], link[rel='shortcut icon']", "href")
}

/// First `href` found walking icon relations from most to least specific.
pub fn favicon_url(doc: &Document) -> Option<String> {
    FAVICON_RELS.iter().find_map(|rel| {
        doc.query_selector(&format!("link[rel='{rel}']"))
            .and_then(|link| link.get("href").map(str::to_string))
    })
}

pub fn style_sheets(doc: &Document) -> Vec<String> {
    collect_attr(doc, "link[rel='stylesheet']", "href")
}

pub fn head_links(doc: &Document) -> Vec<String> {
    collect_attr(doc, "head link", "href")
}

pub fn scripts(doc: &Document) -> Vec<String> {
    collect_attr(doc, "script", "src")
}

fn trimmed_text(el: &Element) -> String {
    el.text_content().trim().to_string()
}

pub fn body_text(doc: &Document) -> Result<String> {
    Ok(trimmed_text(&doc.body()?))
}

/// Text of the first `main` element, falling back to the whole body.
pub fn main_text(doc: &Document) -> Result<String> {
    match doc.query_selector("main") {
        Some(main) => Ok(trimmed_text(&main)),
        None => body_text(doc),
    }
}
