//! Candidate endpoint derivation
//!
//! The flow service has been deployed behind several URL layouts over time
//! (self-hosted Langflow, the hosted Astra gateway, older `/flow/{id}/run`
//! routes). Rather than guessing one, we derive an ordered list and let the
//! client walk it. Nothing here touches the network.

use crate::config::UpstreamConfig;

/// Minimum length of a trailing path segment before we treat it as a flow id
const MIN_FLOW_ID_LEN: usize = 8;

/// Build the ordered, deduplicated candidate list for a configuration
///
/// Priority: explicit run URL, then base + flow id permutations, then bare
/// base fallbacks. Returns an empty list only when there is neither a run URL
/// nor a usable base URL.
pub fn resolve_candidates(config: &UpstreamConfig) -> Vec<String> {
    let run_url = config
        .run_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let base = normalize_base(&config.base_url).or_else(|| run_url.and_then(base_from_run_url));

    let flow_id = config
        .flow_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .or_else(|| run_url.and_then(flow_id_from_run_url));

    let mut candidates = Vec::new();

    if let Some(url) = run_url {
        push_unique(&mut candidates, url.to_string());
    }

    if let Some(base) = base.as_deref() {
        if let Some(id) = flow_id.as_deref() {
            for url in flow_permutations(base, id) {
                push_unique(&mut candidates, url);
            }
        }
        push_unique(&mut candidates, format!("{base}/api/v1/run"));
        push_unique(&mut candidates, format!("{base}/api/run"));
    }

    candidates
}

/// The standard route shapes for a flow id, in the order we try them
fn flow_permutations(base: &str, id: &str) -> [String; 5] {
    [
        format!("{base}/api/v1/run/{id}"),
        format!("{base}/run/{id}"),
        format!("{base}/api/v1/flows/{id}/run"),
        format!("{base}/api/flows/{id}/run"),
        format!("{base}/flow/{id}/run"),
    ]
}

fn normalize_base(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Recover the deployment base from a full run URL
///
/// `https://host/lf/tenant/api/v1/run/abc` -> `https://host/lf/tenant`
fn base_from_run_url(run_url: &str) -> Option<String> {
    let without_query = run_url.split(['?', '#']).next().unwrap_or(run_url);
    let cut = without_query
        .find("/api/")
        .or_else(|| without_query.find("/run/"))?;
    normalize_base(&without_query[..cut])
}

/// A trailing segment with a hyphen and at least 8 chars looks like a flow id
fn flow_id_from_run_url(run_url: &str) -> Option<String> {
    let without_query = run_url.split(['?', '#']).next().unwrap_or(run_url);
    let segment = without_query.trim_end_matches('/').rsplit('/').next()?;
    if segment.contains('-') && segment.len() >= MIN_FLOW_ID_LEN {
        Some(segment.to_string())
    } else {
        None
    }
}

fn push_unique(list: &mut Vec<String>, url: String) {
    if !list.contains(&url) {
        list.push(url);
    }
}
