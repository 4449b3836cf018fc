//! Pilot Common Library
//!
//! Shared types for the pilot workspace: planar geometry, run modes,
//! controller parameter blocks and TOML configuration.
//!
//! # Module Structure
//!
//! - [`geometry`] - Pose, polar vectors and path poses
//! - [`motion`] - Control modes, parameter blocks, engine configuration
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide limits
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use pilot_common::prelude::*;
//!
//! let target = PathPose::new(Pose::new(500.0, 0.0, 90.0)).with_reverse(true);
//! assert!(target.allow_reverse);
//! ```

pub mod config;
pub mod consts;
pub mod geometry;
pub mod motion;
pub mod prelude;
