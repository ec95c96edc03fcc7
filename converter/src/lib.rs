//! # Theme Porter Converter
//!
//! Converts VS Code and JetBrains editor themes into AndroidIDE color scheme
//! bundles. A package is downloaded (or copied from disk), unpacked, searched
//! for its definition file, parsed, normalized into one canonical model and
//! written out as `<scheme_id>/<scheme_id>.json` plus `scheme.prop`.
//!
//! ## Modules
//!
//! - [`archive`] - Zip extraction with path containment checks
//! - [`common`] - HTTP client construction and HTTP errors
//! - [`download`] - Streaming downloads with progress and cancellation
//! - [`emitter`] - Scheme ids and the output bundle
//! - [`locator`] - Finding the definition file inside a package
//! - [`marketplace`] - VS Code Marketplace theme search
//! - [`model`] - The canonical color scheme model
//! - [`normalizer`] - Mapping format keys onto canonical roles
//! - [`parsers`] - VS Code JSON, JetBrains JSON and ICLS parsers
//! - [`pipeline`] - The conversion state machine

pub mod archive;
pub mod common;
pub mod download;
pub mod emitter;
pub mod locator;
pub mod marketplace;
pub mod model;
pub mod normalizer;
pub mod parsers;
pub mod pipeline;

pub use locator::ThemeStore;
pub use pipeline::{
    ConversionError, ConversionEvent, ConversionOutcome, ConversionRequest, ConversionState,
    Converter, ConverterSettings, FailureStage, PackageSource,
};
