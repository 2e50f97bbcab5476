//! Reference models built with `chimes-core`.
//!
//! [`library`] holds fields shared between models: common parameters with their default values
//! and a few derived quantities. Models are either overlays merged onto the library
//! ([`goodwin_keen`], [`goodwin`]) or complete registries of their own ([`two_sector`]).
//! Each model comes with a default preset.

pub mod goodwin;
pub mod goodwin_keen;
pub mod library;
pub mod two_sector;

pub use library::library;
