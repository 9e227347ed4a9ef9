//! Document ingestion

mod service;

pub use service::DocumentService;
