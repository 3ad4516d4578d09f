pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod materialize;
pub mod metadata;
pub mod output;
pub mod probe;
pub mod reconcile;
pub mod sample;
pub mod samplesheet;
pub mod schema;
