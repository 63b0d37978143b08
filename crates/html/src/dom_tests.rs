// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parse_recovers_from_soup() {
    let document = parse_document("<p>unclosed <b>bold");
    assert_eq!(document.select("b").unwrap().count(), 1);
}

#[test]
fn parse_empty_input_yields_shell() {
    let document = parse_document("");
    assert!(document.select_first("body").is_ok());
}

#[test]
fn serialize_round_trips_simple_markup() {
    let document = parse_document("<!DOCTYPE html><html><head></head><body><p>hi</p></body></html>");
    let out = serialize(&document).unwrap();
    assert!(out.contains("<p>hi</p>"));
}

#[test]
fn new_element_carries_attributes() {
    let a = new_element("a", [("href", "#b1".to_string())]);
    assert_eq!(tag_name(&a), "a");
    assert_eq!(attr(&a, "href").as_deref(), Some("#b1"));
}

#[test]
fn set_attr_overwrites() {
    let img = new_element("img", [("src", "x.pdf".to_string())]);
    set_attr(&img, "src", "x.svg");
    assert_eq!(attr(&img, "src").as_deref(), Some("x.svg"));
}

#[test]
fn has_class_matches_tokens() {
    let el = new_element("table", [("class", "ltx_equation ltx_eqn_table".to_string())]);
    assert!(has_class(&el, "ltx_equation"));
    assert!(has_class(&el, "ltx_eqn_table"));
    assert!(!has_class(&el, "ltx_eqn"));
}

#[test]
fn blank_text_detection() {
    let document = parse_document("<body><p>a</p>  \n  <p>b</p></body>");
    let body = document.select_first("body").unwrap();
    let blanks = body
        .as_node()
        .children()
        .filter(is_blank_text)
        .count();
    assert_eq!(blanks, 1);
}

#[test]
fn squash_whitespace_collapses() {
    assert_eq!(squash_whitespace("  Mora, \n  (1989) "), "Mora, (1989)");
}
