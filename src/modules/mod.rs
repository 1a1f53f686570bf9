//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the object storage client and the PDF text extractor.

pub mod extraction;
pub mod storage;
