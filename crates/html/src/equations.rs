// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Display-equation merging.
//!
//! Two producer shapes are handled:
//!
//! - *Tabular form*: the converter hosts one logical display equation in a
//!   `table` spread over several rows/cells. The table is coalesced so the
//!   whole equation occupies a single 1×1 cell.
//! - *Script-container form*: the client-side math renderer emits contiguous
//!   display containers for what is one logical equation. Adjacent containers
//!   are merged into the first, concatenating their math subtrees in
//!   document order.

use kuchikiki::NodeRef;

use crate::dom;

/// Class tokens that mark a table as an equation table.
const EQUATION_TABLE_CLASSES: [&str; 2] = ["ltx_equation", "ltx_eqn_table"];

/// Coalesce every multi-cell equation table into a single 1×1 cell.
///
/// Returns the number of tables rewritten.
pub fn merge_equation_tables(document: &NodeRef) -> usize {
    let tables: Vec<NodeRef> = match document.select("table") {
        Ok(matches) => matches
            .map(|m| m.as_node().clone())
            .filter(|t| EQUATION_TABLE_CLASSES.iter().any(|class| dom::has_class(t, class)))
            .collect(),
        Err(()) => Vec::new(),
    };

    let mut merged = 0;
    for table in tables {
        let rows: Vec<NodeRef> = table
            .descendants()
            .filter(|n| dom::tag_name(n) == "tr")
            .collect();
        let cells: Vec<NodeRef> = table
            .descendants()
            .filter(|n| matches!(dom::tag_name(n).as_str(), "td" | "th"))
            .collect();
        // Already 1×1: nothing to do (and the pass stays idempotent).
        if rows.len() <= 1 && cells.len() <= 1 {
            continue;
        }

        // Gather every cell's content in document order.
        let mut contents: Vec<NodeRef> = Vec::new();
        for cell in &cells {
            let children: Vec<NodeRef> = cell.children().collect();
            for child in children {
                child.detach();
                contents.push(child);
            }
        }

        let cell_class = cells
            .first()
            .and_then(|c| dom::attr(c, "class"))
            .unwrap_or_else(|| "ltx_eqn_cell".to_string());
        let row = dom::new_element("tr", [("class", "ltx_eqn_row".to_string())]);
        let cell = dom::new_element("td", [("class", cell_class)]);
        for content in contents {
            cell.append(content);
        }
        row.append(cell);
        // An explicit tbody keeps serialize→reparse stable; the parser would
        // synthesize one anyway.
        let body = dom::new_bare_element("tbody");
        body.append(row);

        // Replace the table content wholesale with the merged row.
        let old_children: Vec<NodeRef> = table.children().collect();
        for child in old_children {
            child.detach();
        }
        table.append(body);
        merged += 1;
    }

    if merged > 0 {
        tracing::debug!(merged, "coalesced equation tables");
    }
    merged
}

/// Merge contiguous display math containers into one.
///
/// Both renderer families are handled in one enumeration: `mjx-container`
/// elements (CHTML output) and `script type="math/tex; mode=display"`
/// placeholders (legacy output). Runs are bounded by any non-blank sibling.
///
/// Returns the number of containers folded away.
pub fn merge_math_containers(document: &NodeRef) -> usize {
    let containers: Vec<NodeRef> = match document.select("mjx-container, script") {
        Ok(matches) => matches
            .map(|m| m.as_node().clone())
            .filter(is_display_container)
            .collect(),
        Err(()) => Vec::new(),
    };

    let mut folded = 0;
    let mut index = 0;
    while index < containers.len() {
        let head = &containers[index];
        let mut run = vec![head.clone()];
        // Extend the run while the next candidate is the next non-blank
        // sibling of the run's tail.
        while index + run.len() < containers.len() {
            let next = &containers[index + run.len()];
            let tail = match run.last() {
                Some(tail) => tail.clone(),
                None => break,
            };
            if !is_adjacent_sibling(&tail, next) {
                break;
            }
            run.push(next.clone());
        }

        if run.len() > 1 {
            fold_run(&run);
            folded += run.len() - 1;
        }
        index += run.len();
    }

    if folded > 0 {
        tracing::debug!(folded, "merged contiguous math containers");
    }
    folded
}

fn is_display_container(node: &NodeRef) -> bool {
    match dom::tag_name(node).as_str() {
        "mjx-container" => dom::attr(node, "display").as_deref() == Some("true"),
        "script" => dom::attr(node, "type")
            .is_some_and(|t| t.starts_with("math/tex") && t.contains("mode=display")),
        _ => false,
    }
}

/// `next` directly follows `tail` among its parent's children, allowing
/// only whitespace text between them.
fn is_adjacent_sibling(tail: &NodeRef, next: &NodeRef) -> bool {
    let mut cursor = tail.next_sibling();
    while let Some(node) = cursor {
        if &node == next {
            return true;
        }
        if !dom::is_blank_text(&node) {
            return false;
        }
        cursor = node.next_sibling();
    }
    false
}

/// Move every follower's math subtree into the head container, in order.
fn fold_run(run: &[NodeRef]) {
    let Some((head, followers)) = run.split_first() else { return };
    for follower in followers {
        if dom::tag_name(head) == "script" {
            // Legacy form: concatenate the TeX source text.
            let tex = follower.text_contents();
            head.append(NodeRef::new_text(tex));
        } else {
            let children: Vec<NodeRef> = follower.children().collect();
            for child in children {
                child.detach();
                head.append(child);
            }
        }
        follower.detach();
    }
}

#[cfg(test)]
#[path = "equations_tests.rs"]
mod tests;
