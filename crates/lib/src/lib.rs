//! pkgshare-lib: shared replication packages over a hierarchical store
//!
//! This crate provides:
//! - `package`: the package and builder contracts
//! - `share`: a builder decorator that persists packages as path-addressable records
//! - `store`: the resource store sessions records are written through
//! - `config`: where records live and how they are named

pub mod config;
pub mod consts;
pub mod package;
pub mod share;
pub mod store;
