//! Infer tracking plans from captured event schemas.
//!
//! `tracking-plan-gen` reads event schemas captured from live traffic (flat
//! maps whose keys are dot-separated JSON paths) and produces a
//! cross-referenced set of declarative YAML documents: events, properties,
//! custom types, and one tracking plan per source write key.
//!
//! # Pipeline
//!
//! 1. [`unflatten`] rebuilds each schema's nested tree, including sparse arrays.
//! 2. [`path`] selects the analyzed sub-tree (e.g. `$.properties`).
//! 3. [`analyzer`] walks the trees, deduplicating properties by name and type
//!    and custom types by structural content hash.
//! 4. [`codegen`] renders the documents deterministically.
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tracking_plan_gen::analyzer::SchemaAnalyzer;
//! use tracking_plan_gen::config::ExtractionConfig;
//!
//! let schemas = tracking_plan_gen::schema::load_schemas(Path::new("schemas.json"))?;
//! let mut analyzer = SchemaAnalyzer::new(ExtractionConfig::default());
//! analyzer.analyze_schemas(&schemas)?;
//! let stats = tracking_plan_gen::codegen::write_documents(&analyzer, Path::new("out/"), false)?;
//! eprintln!("Generated {} events, {} properties", stats.events, stats.properties);
//! # Ok::<(), tracking_plan_gen::error::Error>(())
//! ```

pub mod analyzer;
pub mod codegen;
pub mod config;
pub mod error;
pub mod factory;
pub mod model;
pub mod naming;
pub mod node;
pub mod path;
pub mod schema;
pub mod type_map;
pub mod unflatten;
