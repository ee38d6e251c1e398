// Input validation shared by the proxy routes and the upload orchestrator

pub mod files;

pub use files::*;
