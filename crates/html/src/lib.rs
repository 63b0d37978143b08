// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! texel-html: the post-processing transformation set that turns raw
//! converter output into polished, self-contained HTML5, plus the asset
//! converter that vectorizes referenced PDFs and TikZ fragments.

pub mod assets;
pub mod citations;
pub mod dom;
pub mod equations;
pub mod error;
pub mod inspect;
pub mod paths;
pub mod postprocess;
pub mod sanitize;

pub use assets::{AssetConverter, AssetOutcome, AssetRef};
pub use error::PostProcessError;
pub use inspect::{inspect, HtmlReport};
pub use paths::relocate_assets;
pub use postprocess::{PostProcessConfig, PostProcessOutcome, PostProcessor};
