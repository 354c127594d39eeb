//! 外部集成：任务服务器（Centrala）

pub mod centrala;

pub use centrala::{CentralaApi, CentralaClient, CentralaResponse};
