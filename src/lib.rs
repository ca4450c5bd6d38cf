pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod output;
pub mod store;
pub mod tools;
