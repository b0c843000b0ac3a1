//! Allow-list based HTML cleanup, backed by Ammonia.

use std::collections::{HashMap, HashSet};

const ALLOWED_TAGS: &[&str] = &[
    "b", "strong", "i", "em", "code", "a", "p", "br", "ul", "ol", "li",
];
const DROPPED_CONTENT_TAGS: &[&str] = &["script", "style", "iframe"];
const LINK_TARGET: &str = "_blank";
const LINK_REL: &str = "noopener noreferrer";

/// Restricts `html` to the inline/structural subset that comments may use.
///
/// Every anchor ends up with `target="_blank"` and
/// `rel="noopener noreferrer"`, whatever the input said.
#[must_use]
pub fn sanitize_html(html: &str) -> String {
    let mut builder = ammonia::Builder::default();
    // `target` is not in the attribute allow-list because it is always overwritten.
    let tag_attributes = HashMap::from([("a", HashSet::from(["href"]))]);
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .clean_content_tags(DROPPED_CONTENT_TAGS.iter().copied().collect())
        .generic_attributes(HashSet::new())
        .tag_attributes(tag_attributes)
        .set_tag_attribute_value("a", "target", LINK_TARGET)
        .link_rel(Some(LINK_REL));
    builder.clean(html).to_string()
}

/// Removes all markup and keeps the text.
#[must_use]
pub fn strip_all_html(html: &str) -> String {
    let mut builder = ammonia::Builder::empty();
    builder.clean_content_tags(DROPPED_CONTENT_TAGS.iter().copied().collect());
    builder.clean(html).to_string()
}
