//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace span, timeout)
//!     → site.rs (serve the page the path names, or 404)
//!     → middleware/link_mapping.rs (engine decides on the finished response)
//!     → response.rs (redirect with Location header)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod site;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
