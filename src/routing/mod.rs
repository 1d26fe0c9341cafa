//! Routing module
//!
//! Compiles URL rules with typed placeholders into matchers and resolves
//! inbound (method, path) pairs:
//! - Pattern compilation with string/int/float/path placeholder types
//! - Specificity-ordered matching with trailing-slash canonicalization
//! - Reverse URL construction from endpoint name and parameters

mod builder;
mod matcher;
mod pattern;

pub use matcher::{Route, RouteMap, RouteMatch};
pub use pattern::{ParamValue, PathArgs, Pattern, PlaceholderKind, Segment};
