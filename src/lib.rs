//! Crafting cost and market analysis for auction-house traders.

pub mod app;
pub mod domain;
pub mod infra;
pub mod ui;
pub mod util;
