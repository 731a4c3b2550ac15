//! onefile: CommonJS package bundler that produces a single .js file
//!
//! The bundler resolves a package's full dependency graph starting from its
//! `package.json`, discovers the modules under each package's source
//! directories, and emits one self-contained script that reproduces the
//! module system at runtime through a small require shim.

pub mod config;
pub mod error;
pub mod flatten;
pub mod ident;
pub mod manifest;
pub mod modules;
pub mod orchestrator;
pub mod render;
pub mod require_scan;
pub mod resolver;
