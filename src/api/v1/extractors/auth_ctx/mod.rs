/*!
 * Authenticated identity + role gate
 *
 * - core: the `Authorized<P>` extractor (axum-facing)
 * - types: IdentityClaim, role policies and per-route aliases
 */

mod core;
mod types;

pub use core::Authorized;
pub use types::*;
