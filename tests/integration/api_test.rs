//! API endpoint integration tests
//!
//! Tests for the catalog, changelists and merges HTTP surfaces.

#![allow(dead_code)]

mod catalog;
mod changelists;
mod common;
mod merges;
