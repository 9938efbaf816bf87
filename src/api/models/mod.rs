pub mod import;
pub mod metadata;

pub use import::*;
pub use metadata::*;
