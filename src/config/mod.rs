pub mod types;
pub mod catalog;
pub mod client;
pub mod loader;
pub mod validator;
pub mod resolved;

pub use types::*;
pub use catalog::default_catalog;
pub use client::*;
pub use loader::*;
pub use validator::*;
pub use resolved::*;
