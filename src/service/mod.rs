//! Payload validation applied before any mutation reaches a backend.

mod validation;
pub use validation::RequestValidator;
