pub mod layout;
pub mod resolve;
pub mod scan;

pub use layout::OutputLayout;
pub use scan::{certificates, holes_in_certificate, Hole};

/// Errors from corpus discovery and layout resolution.
#[derive(Debug, thiserror::Error)]
pub enum ProspectorError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
