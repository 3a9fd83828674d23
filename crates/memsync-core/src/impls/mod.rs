//! Impls - ports の実装
//!
//! - **HttpBackend**: reqwest によるリモートメモリ API（Uploader + HealthProbe）

pub mod http_backend;

pub use self::http_backend::HttpBackend;
