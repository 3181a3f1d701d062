pub mod documents;
pub mod error;
