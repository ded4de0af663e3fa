//! Clinical note keyword extraction served over a single-page form.
//!
//! A note is wrapped in a fixed instruction prompt, run through a locally
//! loaded causal LM, and the answer after `[/INST]` is split on commas into a
//! deduplicated keyword set.

pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod page;
pub mod processor;
pub mod prompt;
pub mod util;
