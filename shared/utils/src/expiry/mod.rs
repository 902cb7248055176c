//! Expiry Date Inference
//!
//! Recovers a best-guess expiry date from noisy scanned text.
//! Matching is deliberately loose; the result is a suggestion the owner
//! confirms, never a final value.

pub mod inference;
pub mod parser;
pub mod scanner;

pub use inference::{ExpiryInferencer, EXPIRY_KEYWORDS};
pub use parser::{parse_date, DateFormat};
pub use scanner::scan_dates;
