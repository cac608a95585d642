pub mod adapter;
pub mod config;
pub mod export;
pub mod filter;
pub mod loader;
pub mod logging;
pub mod model;
pub mod parens;
pub mod render;
pub mod session;
pub mod store;
pub mod viewer;
pub mod wiki;
