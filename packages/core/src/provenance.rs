//! Cross-universe provenance records.

use serde::{Deserialize, Serialize};

/// Provenance of a remix that crossed universe boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRecord {
    pub coin_id: String,
    pub source_universe: String,
    pub source_coin: String,
    pub proof: String,
}

impl BridgeRecord {
    /// Payload keys a registration must carry, in reporting order.
    pub const REQUIRED_FIELDS: [&'static str; 4] =
        ["coin_id", "source_universe", "source_coin", "proof"];
}
