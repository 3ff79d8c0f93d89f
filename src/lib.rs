//! Bookshelf application library
//!
//! Application modules plus the bootstrap that wires them into the kernel,
//! database, and HTTP server.

pub mod app;
pub mod modules;

pub use app::Application;
