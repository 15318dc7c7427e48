//! File-backed collaborators: everything that touches disk lives here.

pub mod loaders;

pub use loaders::{LoadError, MarketData};
