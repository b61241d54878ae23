use thiserror::Error;

pub mod account;
pub mod ctf;
pub mod lab;
pub mod stats;
pub mod system;

/// Raised when a stored text column does not name a known enum variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {field} value '{value}'")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(field: &'static str, value: &str) -> Self {
        UnknownVariant {
            field,
            value: value.to_string(),
        }
    }
}
