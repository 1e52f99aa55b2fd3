/**
 * Responsibility
 *  - Bundle core (extractor) and types (per-collection tags)
 *  - Control what handlers can see
 */
mod core;
mod types;

pub use types::*;
