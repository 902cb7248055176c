use thiserror::Error;

/// Returned when a stored or submitted string does not name a known variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
