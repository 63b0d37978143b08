// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Small DOM helpers shared by the transformation passes.

use html5ever::{namespace_url, ns, LocalName, QualName};
use kuchikiki::traits::TendrilSink;
use kuchikiki::{Attribute, ExpandedName, NodeRef};

use crate::error::PostProcessError;

/// Parse a full document leniently. html5ever recovers from any input; an
/// empty payload still yields the synthesized `html`/`head`/`body` shell.
pub fn parse_document(html: &str) -> NodeRef {
    kuchikiki::parse_html().one(html)
}

/// Minimal well-formed skeleton emitted when the converter produced nothing.
pub const SKELETON: &str = "<!DOCTYPE html>\
<html lang=\"en\"><head><title>Converted document</title></head>\
<body></body></html>";

/// Serialize a document back to a string.
pub fn serialize(document: &NodeRef) -> Result<String, PostProcessError> {
    let mut bytes = Vec::new();
    document
        .serialize(&mut bytes)
        .map_err(|e| PostProcessError::Serialize(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PostProcessError::Serialize(e.to_string()))
}

/// Build an element in the HTML namespace with plain attributes.
pub fn new_element<'a>(
    name: &str,
    attributes: impl IntoIterator<Item = (&'a str, String)>,
) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, ns!(html), LocalName::from(name)),
        attributes.into_iter().map(|(key, value)| {
            (
                ExpandedName::new(ns!(), LocalName::from(key)),
                Attribute { prefix: None, value },
            )
        }),
    )
}

/// Build an attribute-less element in the HTML namespace.
pub fn new_bare_element(name: &str) -> NodeRef {
    new_element(name, std::iter::empty::<(&str, String)>())
}

/// The element's local tag name, or `""` for non-elements.
pub fn tag_name(node: &NodeRef) -> String {
    node.as_element().map(|e| e.name.local.to_string()).unwrap_or_default()
}

/// Read one attribute off an element node.
pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    attributes.get(name).map(|v| v.to_string())
}

/// Set one attribute on an element node (no-op for non-elements).
pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().insert(name, value.to_string());
    }
}

/// Whether the element's `class` attribute contains `needle` as a token.
pub fn has_class(node: &NodeRef, needle: &str) -> bool {
    attr(node, "class")
        .map(|classes| classes.split_ascii_whitespace().any(|c| c == needle))
        .unwrap_or(false)
}

/// Whether the node is a text node consisting solely of whitespace.
pub fn is_blank_text(node: &NodeRef) -> bool {
    match node.as_text() {
        Some(text) => text.borrow().trim().is_empty(),
        None => false,
    }
}

/// Collapse internal whitespace runs to single spaces and trim.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "dom_tests.rs"]
mod tests;
