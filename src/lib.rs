pub mod common;
pub mod config;
pub mod map;
pub mod protocol;
pub mod scenario;
pub mod solver;
pub mod stat;
