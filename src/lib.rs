//! Meal logging core: a local meal store, an image store, and a client that
//! drafts meals (name, description, picture) through a text and image
//! generation API.

pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod images;
pub mod meals;
pub mod state;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
mod test_support;

pub use error::{GenerationError, ImageStoreError, PipelineError, StoreError};
pub use state::AppState;
