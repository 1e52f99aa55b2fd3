/*
 * Responsibility
 * - API versions; only v1 exists
 */
pub mod v1;
