//! Core domain logic for filmcatalog.
//!
//! The content graph and its reload pipeline, plus the read-only views
//! presentation code builds on: listings, classification, map framing and
//! display labels.

pub mod assets;
pub mod graph;
pub mod labels;
pub mod map;
pub mod pipeline;
pub mod query;
