pub mod defaults;
pub mod settings;

pub use settings::{GarbageLevel, SaveOptions, Settings};
