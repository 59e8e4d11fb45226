//! Strength ladder lookups and the weaker-strength unlock rule.

use ditchpouch_core::types::{Choice, UnlockPolicy, strength_choice_id};

/// Whether `mg` is a permitted tier.
pub fn contains(ladder: &[u32], mg: u32) -> bool {
    ladder.contains(&mg)
}

/// Tiers at or below `ceiling` (all tiers when `None`), in ladder order.
pub fn selectable(ladder: &[u32], ceiling: Option<u32>) -> Vec<u32> {
    ladder
        .iter()
        .copied()
        .filter(|mg| ceiling.is_none_or(|c| *mg <= c))
        .collect()
}

/// Tiers offered when the user unlocks a weaker strength from `current`.
pub fn weaker_options(ladder: &[u32], current: u32, policy: &UnlockPolicy) -> Vec<u32> {
    let below = ladder.iter().copied().filter(|mg| *mg < current);
    match policy {
        UnlockPolicy::AllBelow => below.collect(),
        UnlockPolicy::NextTier => below.max().into_iter().collect(),
        UnlockPolicy::Candidates(candidates) => candidates
            .iter()
            .copied()
            .filter(|mg| *mg < current && ladder.contains(mg))
            .collect(),
    }
}

/// List rows for the given tiers.
pub fn choices(tiers: &[u32]) -> Vec<Choice> {
    tiers
        .iter()
        .map(|mg| Choice::new(strength_choice_id(*mg), format!("{mg}mg")))
        .collect()
}
