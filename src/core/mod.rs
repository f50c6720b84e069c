pub mod diagnostics;
pub mod error;
pub mod model;
pub mod script;
