// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Script sanitization.

use kuchikiki::NodeRef;

use crate::dom;
use crate::postprocess::MATH_CONFIG_ID;

/// Drop every `script` element whose source is neither the injected math
/// renderer nor covered by a known-safe prefix.
///
/// Returns how many elements were removed.
pub fn sanitize_scripts(document: &NodeRef, safe_prefixes: &[String]) -> usize {
    let scripts: Vec<NodeRef> = match document.select("script") {
        Ok(matches) => matches.map(|m| m.as_node().clone()).collect(),
        Err(()) => Vec::new(),
    };

    let mut removed = 0;
    for script in scripts {
        if is_safe(&script, safe_prefixes) {
            continue;
        }
        script.detach();
        removed += 1;
    }
    if removed > 0 {
        tracing::debug!(removed, "dropped unsafe script elements");
    }
    removed
}

fn is_safe(script: &NodeRef, safe_prefixes: &[String]) -> bool {
    // The math renderer configuration block we inject is inline but marked.
    if dom::attr(script, "id").as_deref() == Some(MATH_CONFIG_ID) {
        return true;
    }
    match dom::attr(script, "src") {
        Some(src) => safe_prefixes.iter().any(|prefix| src.starts_with(prefix.as_str())),
        // Inline scripts have no source to vouch for them.
        None => false,
    }
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
