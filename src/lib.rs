pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod global;
pub mod join;
pub mod meeting;
pub mod surface;
