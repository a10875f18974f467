//! Canonical event names published on the hook bus.
//!
//! Use these constants when subscribing or emitting so producers and
//! observers agree on the identifier.

// Network analysis
pub const NETWORK_ANALYSIS: &str = "network_analysis";
pub const VALIDATOR_REPUTATIONS: &str = "reputations_updated";
pub const CONSENSUS_FORECAST_RUN: &str = "consensus_forecast_run";
pub const REPUTATION_ANALYSIS_RUN: &str = "reputation_analysis_run";
pub const COORDINATION_ANALYSIS_RUN: &str = "coordination_analysis_run";
pub const ENTANGLEMENT_SIMULATION_RUN: &str = "entanglement_simulation_run";

// Protocol agents and utilities
pub const BRIDGE_REGISTERED: &str = "bridge_registered";
pub const PROVENANCE_RETURNED: &str = "provenance_returned";
pub const SUGGESTION_INSPECTED: &str = "suggestion_inspected";
pub const FIX_PROPOSED: &str = "fix_proposed";
pub const MIDI_GENERATED: &str = "midi_generated";

// Hypothesis and introspection
pub const HYPOTHESIS_RANKING: &str = "hypothesis_ranking";
pub const HYPOTHESIS_CONFLICTS: &str = "hypothesis_conflicts";
pub const HYPOTHESIS_REGISTERED: &str = "hypothesis_registered";
pub const HYPOTHESIS_SCORE_UPDATED: &str = "hypothesis_score_updated";
pub const FULL_AUDIT_COMPLETED: &str = "full_audit_completed";
pub const AUDIT_LOG: &str = "audit_log";

// Core protocol
pub const CROSS_REMIX_CREATED: &str = "cross_remix_created";
pub const CROSS_REMIX: &str = "cross_remix";
pub const ENTROPY_DIVERGENCE: &str = "entropy_divergence";

/// Constant name to identifier, in declaration order.
pub const CATALOG: &[(&str, &str)] = &[
    ("NETWORK_ANALYSIS", NETWORK_ANALYSIS),
    ("VALIDATOR_REPUTATIONS", VALIDATOR_REPUTATIONS),
    ("CONSENSUS_FORECAST_RUN", CONSENSUS_FORECAST_RUN),
    ("REPUTATION_ANALYSIS_RUN", REPUTATION_ANALYSIS_RUN),
    ("COORDINATION_ANALYSIS_RUN", COORDINATION_ANALYSIS_RUN),
    ("ENTANGLEMENT_SIMULATION_RUN", ENTANGLEMENT_SIMULATION_RUN),
    ("BRIDGE_REGISTERED", BRIDGE_REGISTERED),
    ("PROVENANCE_RETURNED", PROVENANCE_RETURNED),
    ("SUGGESTION_INSPECTED", SUGGESTION_INSPECTED),
    ("FIX_PROPOSED", FIX_PROPOSED),
    ("MIDI_GENERATED", MIDI_GENERATED),
    ("HYPOTHESIS_RANKING", HYPOTHESIS_RANKING),
    ("HYPOTHESIS_CONFLICTS", HYPOTHESIS_CONFLICTS),
    ("HYPOTHESIS_REGISTERED", HYPOTHESIS_REGISTERED),
    ("HYPOTHESIS_SCORE_UPDATED", HYPOTHESIS_SCORE_UPDATED),
    ("FULL_AUDIT_COMPLETED", FULL_AUDIT_COMPLETED),
    ("AUDIT_LOG", AUDIT_LOG),
    ("CROSS_REMIX_CREATED", CROSS_REMIX_CREATED),
    ("CROSS_REMIX", CROSS_REMIX),
    ("ENTROPY_DIVERGENCE", ENTROPY_DIVERGENCE),
];

/// Look up the identifier for a constant name such as `"BRIDGE_REGISTERED"`.
pub fn identifier(constant: &str) -> Option<&'static str> {
    CATALOG
        .iter()
        .find(|(name, _)| *name == constant)
        .map(|(_, id)| *id)
}

/// Whether `name` is one of the catalogued identifiers.
pub fn is_known(name: &str) -> bool {
    CATALOG.iter().any(|(_, id)| *id == name)
}
