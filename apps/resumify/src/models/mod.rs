pub mod chat;
pub mod gallery;
pub mod resume;
