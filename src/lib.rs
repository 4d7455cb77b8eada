// src/lib.rs

pub mod common;
pub mod generator;
pub mod server;
