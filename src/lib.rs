//! Buildpack supply step for the Riverbed AppInternals .NET Core profiler.
//!
//! When the app is bound to an AppInternals service, the profiler archive named
//! in the binding credentials is downloaded into this step's dependency
//! directory and a `profile.d` fragment enables CoreCLR profiling at launch.

pub mod core;
pub mod utils;

// Re-export everything from core for ergonomic library use
// Users can write `riverbed_supply::bindings` instead of `riverbed_supply::core::bindings`
pub use self::core::*;
pub use self::utils::*;
