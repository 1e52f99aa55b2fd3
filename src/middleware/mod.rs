/*
 * Responsibility
 * - Router-level middleware: transport concerns (http), browser policy (cors,
 *   security_headers) and bearer verification (auth)
 */
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
