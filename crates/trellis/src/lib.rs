//! Trellis - a workstream portfolio and dependency tracker.
//!
//! Trellis organizes release work into a bounded-depth hierarchy of
//! workstreams, attaches permission grants that flow down that hierarchy,
//! links work items with typed dependency edges, and answers schedule
//! questions over the result: what is ready to start, what slips when an
//! item slips, how complete is a subtree.
//!
//! # Architecture
//!
//! - [`domain`]: plain data types (workstreams, grants, items, edges, reports)
//! - [`store`]: the [`store::PortfolioStore`] trait and its in-memory /
//!   snapshot-backed implementations
//! - [`permissions`]: effective-access resolution over the hierarchy
//! - [`impact`]: delay propagation and critical path analysis
//! - [`rollup`]: cached subtree completion aggregates
//! - [`app`]: application context pairing store writes with cache invalidation
//! - [`cli`] / [`output`] / [`commands`]: the command-line surface
//!
//! Persistence is one JSONL snapshot per portfolio under `.trellis/`,
//! written atomically via the `trellis-jsonl` crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod impact;
pub mod output;
pub mod permissions;
pub mod rollup;
pub mod store;

pub use error::{Error, Result};
