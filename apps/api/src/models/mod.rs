pub mod document;
pub mod screening;
