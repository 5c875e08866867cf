mod engine;
mod slot;

pub use engine::{Engine, EngineConfig};
