// src/generator/mod.rs
//
// 配置生成核心：设置模型、文档模型与各个构建器

pub mod address;
pub mod dns;
pub mod model;
pub mod outbound;
pub mod resolver;
pub mod routing;
pub mod scenario;
pub mod settings;
pub mod template;
