// src/lib.rs

pub mod config;
pub mod eventbus;
pub mod repositories;
pub mod services;
pub mod tasks;
pub mod utils;

pub use relaybot_common::error::Error;
