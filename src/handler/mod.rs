//! Request handler module
//!
//! Request routing plus the page, conversion, transcription and download
//! handlers.

mod common;
pub mod convert;
pub mod download;
pub mod pages;
pub mod router;
pub mod transcribe;

// Re-export main entry point
pub use pages::Pages;
pub use router::handle_request;
