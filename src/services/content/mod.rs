/*
 * Responsibility
 * - Generative-content collaborator used to attach study resources to a course
 * - The prompt/response schema belongs to the remote service; this side only
 *   sends (content, context) and validates the returned resource set
 */
pub mod client;
pub mod http;

pub use client::{
    DisabledGenerator, GenerationContext, GeneratorError, ResourceGenerator, ResourceItem,
    ResourceSet, sanitize,
};
pub use http::HttpResourceGenerator;
