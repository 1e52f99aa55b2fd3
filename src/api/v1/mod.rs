/*
 * Responsibility
 * - v1 surface: routes() plus the pieces handlers are built from
 */
pub mod dto;
pub mod extractors;
pub mod handlers;
mod response;
mod routes;

pub use routes::routes;
