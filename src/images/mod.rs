mod services;

pub use services::{ImageSource, ImageStore};
