//! Job configuration: canonical arguments, commands, and array detection

/// Ordered argument map and command list
pub mod model;

/// Wall-time and array-index canonicalisation
pub mod normalize;

/// Load configurations from declarative YAML/JSON documents
pub mod load;
