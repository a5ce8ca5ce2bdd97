// src/services/mod.rs
pub mod codec;
pub mod edit;
pub mod generation;
pub mod geometry;
pub mod plan_parser;
pub mod remote;

pub use edit::EditClient;
pub use generation::GenerationClient;
