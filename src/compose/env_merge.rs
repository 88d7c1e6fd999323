//! Priority-ordered merge of environment variable layers.
//!
//! Four tiers, ascending priority: base (platform-computed) < app (owning
//! team) < env (environment file) < additional (fine-grained override).
//! The merged output contains each distinct name exactly once, bound to the
//! value from its highest tier; colliding lower-tier entries are dropped,
//! not overwritten in place, so the final ordering follows tier order with
//! first-seen ordering inside each tier. envFrom sources carry no identity,
//! so their merge is plain app-then-env concatenation.

use std::collections::HashSet;

use k8s_openapi::api::core::v1::{EnvFromSource, EnvVar};

/// Merge the four env var tiers into a duplicate-free list. O(n) in total entries.
pub fn merge_env(
    base: &[EnvVar],
    app: &[EnvVar],
    env: &[EnvVar],
    additional: &[EnvVar],
) -> Vec<EnvVar> {
    let mut merged = Vec::with_capacity(base.len() + app.len() + env.len() + additional.len());

    // Names claimed by strictly higher tiers, built highest-first.
    let mut claimed: HashSet<&str> = HashSet::new();
    let tiers = [base, app, env, additional];
    let mut shadowed_per_tier: Vec<HashSet<&str>> = Vec::with_capacity(tiers.len());
    for (idx, _) in tiers.iter().enumerate() {
        let mut shadowed = HashSet::new();
        for higher in &tiers[idx + 1..] {
            for var in higher.iter() {
                shadowed.insert(var.name.as_str());
            }
        }
        shadowed_per_tier.push(shadowed);
    }

    for (tier, shadowed) in tiers.iter().zip(shadowed_per_tier.iter()) {
        for var in tier.iter() {
            if shadowed.contains(var.name.as_str()) {
                continue;
            }
            // First occurrence within a tier wins; later duplicates in the
            // same tier are dropped as well.
            if claimed.insert(var.name.as_str()) {
                merged.push(var.clone());
            }
        }
    }

    merged
}

/// Concatenate the app- and env-tier envFrom sources, app first.
pub fn merge_env_from(app: &[EnvFromSource], env: &[EnvFromSource]) -> Vec<EnvFromSource> {
    app.iter().chain(env.iter()).cloned().collect()
}
