pub mod api_client;
pub mod autosave;
pub mod chat;
pub mod config;
pub mod errors;
pub mod form;
pub mod gallery;
pub mod models;
pub mod session;
pub mod state;
pub mod voice;

#[cfg(test)]
mod test_support;
