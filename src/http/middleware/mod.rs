//! Middleware applied to site routes.

pub mod link_mapping;

pub use link_mapping::link_mapping_middleware;
