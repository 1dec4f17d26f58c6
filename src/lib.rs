//! Core library for the bc-fetch command line application.
//!
//! The library fetches Business Central configuration tables for every
//! configured (company, resource) pair and consolidates them into one Excel
//! workbook plus a JSON run summary. Modules keep responsibilities narrow:
//! configuration in [`config`], HTTP access in [`client`], payload
//! tabulation and sheet naming in [`flatten`], the fetch loop in [`fetch`],
//! file output under [`io`], and the end-to-end orchestration in
//! [`pipeline`].

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod flatten;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod results;

pub use error::{FailureReason, FetchError, Result, ToolError};
