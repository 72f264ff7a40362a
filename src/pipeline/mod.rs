pub(crate) mod adapters;
pub mod chain;
pub mod config;
pub mod emit;
pub mod flatten;
pub mod just;
pub mod stage;
pub mod state;
pub mod take;
