pub mod claim;
pub mod config;
pub mod general;
