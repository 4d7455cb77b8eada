// src/common/mod.rs

pub mod consts;
pub mod error;
pub mod utils;
