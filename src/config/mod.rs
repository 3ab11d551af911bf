//! Configuration: runtime settings, input sources and template/action resolution.
//!
//! ## Contents
//! - [`ManagerConfig`] runtime knobs (gate size, bus capacity, default timeout, grace)
//! - [`ConfigSources`] the three raw input maps (plugins, templates, actions)
//! - [`ConfigResolver`] merges `BasePlugin` < template < options into [`Params`]
//! - [`Params`], [`Filter`], [`merge`] typed parameter maps and single-key filters

mod manager;
mod params;
mod resolver;
mod sources;

pub use manager::ManagerConfig;
pub use params::{keys, merge, Filter, Params, BASE_TEMPLATE};
pub use resolver::ConfigResolver;
pub use sources::ConfigSources;

pub(crate) use params::seconds;
