//! Open key-value store for strategy-supplied auxiliary data.

use std::collections::BTreeMap;

/// Strategy metadata attached to orders, positions and trades.
///
/// Values are arbitrary JSON so strategies can stash numbers, strings or
/// nested structures (opening-range bounds, water marks, exit reasons).
pub type Metadata = BTreeMap<String, serde_json::Value>;
