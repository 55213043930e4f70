//! OpenRouter pricing lookup for cost estimation.
//!
//! Pricing comes from `GET https://openrouter.ai/api/v1/models`, cached on
//! disk for a day so the dashboard does not hit the network on every start.
//! Model names rarely match OpenRouter ids exactly, so lookup degrades from
//! exact id to slug to date-stripped slug to a fuzzy match.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::OnceCell;
use tracing::{debug, warn};

use crate::stats::Tokens;

const OPENROUTER_MODELS_URL: &str = "https://openrouter.ai/api/v1/models";
const DEFAULT_CACHE_TTL_SECS: u64 = 86400;

static CACHE_TTL_SECS: std::sync::atomic::AtomicU64 =
    std::sync::atomic::AtomicU64::new(DEFAULT_CACHE_TTL_SECS);

/// Override the disk cache lifetime. Must be called before `init_pricing`
/// to affect the initial load.
pub fn set_cache_ttl_hours(hours: u64) {
    CACHE_TTL_SECS.store(hours * 3600, std::sync::atomic::Ordering::Relaxed);
}

fn cache_ttl() -> Duration {
    Duration::from_secs(CACHE_TTL_SECS.load(std::sync::atomic::Ordering::Relaxed))
}

/// Per-token rates for a model, in dollars.
#[derive(Clone, Copy)]
pub struct ModelPricing {
    pub prompt: f64,
    pub completion: f64,
    pub reasoning: f64,
    pub input_cache_read: f64,
    pub input_cache_write: f64,
}

static PRICING_CACHE: OnceCell<HashMap<String, ModelPricing>> = OnceCell::new();

/// Warm the pricing table. Called once at startup, off the render thread.
pub fn init_pricing() {
    let _ = PRICING_CACHE.get_or_init(fetch_pricing);
}

/// Look up pricing for a model name, refetching once on a miss so newly
/// released models resolve without a restart.
pub fn lookup_pricing(model_name: &str) -> Option<ModelPricing> {
    let cache = PRICING_CACHE.get_or_init(fetch_pricing);
    if let Some(found) = lookup_in_map(cache, model_name) {
        return Some(found);
    }

    let live = fetch_pricing();
    if live.is_empty() {
        return None;
    }
    lookup_in_map(&live, model_name)
}

/// Estimated dollar cost of the given token usage at this model's rates.
pub fn estimate_cost(model_name: &str, tokens: &Tokens) -> Option<f64> {
    let p = lookup_pricing(model_name)?;
    Some(
        tokens.input as f64 * p.prompt
            + tokens.output as f64 * p.completion
            + tokens.reasoning as f64 * p.reasoning
            + tokens.cache_read as f64 * p.input_cache_read
            + tokens.cache_write as f64 * p.input_cache_write,
    )
}

fn lookup_in_map(map: &HashMap<String, ModelPricing>, model_name: &str) -> Option<ModelPricing> {
    if map.is_empty() {
        return None;
    }

    let input = model_name.trim().to_ascii_lowercase();
    let slug = input.rsplit('/').next().unwrap_or(&input).to_string();

    if let Some(p) = map.get(input.as_str()) {
        return Some(*p);
    }
    if let Some(p) = map.get(slug.as_str()) {
        return Some(*p);
    }

    let stripped = strip_date_suffix(&slug);
    if stripped != slug {
        if let Some(p) = map.get(stripped) {
            return Some(*p);
        }
    }

    let local_norm = normalize(stripped);
    if local_norm.is_empty() {
        return None;
    }
    let mut best_score: usize = 0;
    let mut best: Option<ModelPricing> = None;

    for (key, pricing) in map.iter() {
        if key.contains('/') {
            continue;
        }
        let key_norm = normalize(strip_date_suffix(key));
        let s = fuzzy_score(&local_norm, &key_norm);
        if s > best_score {
            best_score = s;
            best = Some(*pricing);
        }
    }

    // Require at least a 60% overlap before trusting a fuzzy hit.
    if best_score > 0 {
        let min_required = (local_norm.len().max(3) * 6) / 10;
        if best_score >= min_required {
            return best;
        }
    }

    None
}

fn normalize(slug: &str) -> String {
    slug.chars()
        .filter(|c| *c != '-' && *c != '.' && *c != ':')
        .collect()
}

/// Longest common subsequence length on bytes, with shortcuts for exact and
/// prefix matches.
fn fuzzy_score(a: &str, b: &str) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return a.len() * 2;
    }
    if b.starts_with(a) || a.starts_with(b) {
        return a.len().min(b.len()) * 2;
    }

    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut prev = vec![0u16; b.len() + 1];
    let mut curr = vec![0u16; b.len() + 1];
    for &ac in a {
        for (j, &bc) in b.iter().enumerate() {
            curr[j + 1] = if ac == bc {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        prev.copy_from_slice(&curr);
        curr.fill(0);
    }
    prev[b.len()] as usize
}

/// Strip a trailing date suffix (`-MMDD` or `-YYYYMMDD`).
fn strip_date_suffix(slug: &str) -> &str {
    let Some(pos) = slug.rfind('-') else {
        return slug;
    };
    let tail = &slug[pos + 1..];
    if looks_like_yyyymmdd(tail) || looks_like_mmdd(tail) {
        return &slug[..pos];
    }
    slug
}

fn looks_like_mmdd(tail: &str) -> bool {
    if tail.len() != 4 || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let mm: u32 = tail[0..2].parse().unwrap_or(0);
    let dd: u32 = tail[2..4].parse().unwrap_or(0);
    (1..=12).contains(&mm) && (1..=31).contains(&dd)
}

fn looks_like_yyyymmdd(tail: &str) -> bool {
    if tail.len() != 8 || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let yyyy: u32 = tail[0..4].parse().unwrap_or(0);
    let mm: u32 = tail[4..6].parse().unwrap_or(0);
    let dd: u32 = tail[6..8].parse().unwrap_or(0);
    (2020..=2100).contains(&yyyy) && (1..=12).contains(&mm) && (1..=31).contains(&dd)
}

fn cache_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".cache")
        })
        .join("ocstats")
        .join("openrouter-pricing.json")
}

fn cache_is_fresh() -> bool {
    let Ok(meta) = std::fs::metadata(cache_path()) else {
        return false;
    };
    meta.modified()
        .ok()
        .and_then(|t| t.elapsed().ok())
        .is_some_and(|age| age < cache_ttl())
}

fn parse_body(body: &serde_json::Value) -> HashMap<String, ModelPricing> {
    let Some(data) = body.get("data").and_then(|d| d.as_array()) else {
        return HashMap::new();
    };
    let mut map = HashMap::new();
    for m in data {
        let Some(id) = m.get("id").and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(pr) = m.get("pricing").and_then(|v| v.as_object()) else {
            continue;
        };
        let p = |k: &str| -> f64 {
            pr.get(k)
                .and_then(|v| {
                    v.as_str()
                        .and_then(|s| s.parse().ok())
                        .or_else(|| v.as_f64())
                })
                .unwrap_or(0.0)
                .max(0.0)
        };
        let prompt = p("prompt");
        let completion = p("completion");
        // OpenRouter reports zero reasoning rates for most models; those
        // bill reasoning at the completion rate.
        let reasoning = {
            let r = p("reasoning");
            if r == 0.0 {
                completion
            } else {
                r
            }
        };
        let pricing = ModelPricing {
            prompt,
            completion,
            reasoning,
            input_cache_read: p("input_cache_read"),
            input_cache_write: p("input_cache_write"),
        };

        let slug = id.rsplit('/').next().unwrap_or(id).to_ascii_lowercase();
        let full = id.to_ascii_lowercase();

        map.entry(full).or_insert(pricing);
        map.entry(slug).or_insert(pricing);
    }
    map
}

fn fetch_pricing() -> HashMap<String, ModelPricing> {
    let path = cache_path();

    if cache_is_fresh() {
        if let Ok(bytes) = std::fs::read(&path) {
            if let Ok(body) = serde_json::from_slice::<serde_json::Value>(&bytes) {
                let map = parse_body(&body);
                if !map.is_empty() {
                    debug!(models = map.len(), "loaded pricing from disk cache");
                    return map;
                }
            }
        }
    }

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(30)))
        .build()
        .into();
    let body = agent
        .get(OPENROUTER_MODELS_URL)
        .call()
        .ok()
        .and_then(|mut r| r.body_mut().read_json::<serde_json::Value>().ok());

    if let Some(ref b) = body {
        let map = parse_body(b);
        if !map.is_empty() {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = std::fs::write(&path, serde_json::to_string(b).unwrap_or_default());
            debug!(models = map.len(), "fetched pricing from openrouter");
            return map;
        }
    }

    // Network failed; a stale cache is still better than no pricing.
    if let Ok(bytes) = std::fs::read(&path) {
        if let Ok(b) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            let map = parse_body(&b);
            if !map.is_empty() {
                warn!("pricing fetch failed, using stale disk cache");
                return map;
            }
        }
    }

    warn!("no pricing available, cost estimates disabled");
    HashMap::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> HashMap<String, ModelPricing> {
        parse_body(
            &serde_json::json!({
                "data": [
                    {
                        "id": "anthropic/claude-sonnet-4",
                        "pricing": {"prompt": "0.000003", "completion": "0.000015", "input_cache_read": "0.0000003"}
                    },
                    {
                        "id": "openai/gpt-4o-mini",
                        "pricing": {"prompt": 0.00000015, "completion": 0.0000006}
                    }
                ]
            }),
        )
    }

    #[test]
    fn test_parse_body_indexes_full_id_and_slug() {
        let map = sample_map();
        assert!(map.contains_key("anthropic/claude-sonnet-4"));
        assert!(map.contains_key("claude-sonnet-4"));
        let p = map["claude-sonnet-4"];
        assert!((p.prompt - 0.000003).abs() < 1e-12);
        // Zero reasoning rate falls back to the completion rate.
        assert!((p.reasoning - 0.000015).abs() < 1e-12);
    }

    #[test]
    fn test_lookup_exact_and_slug() {
        let map = sample_map();
        assert!(lookup_in_map(&map, "anthropic/claude-sonnet-4").is_some());
        assert!(lookup_in_map(&map, "CLAUDE-SONNET-4").is_some());
    }

    #[test]
    fn test_lookup_strips_date_suffix() {
        let map = sample_map();
        assert!(lookup_in_map(&map, "claude-sonnet-4-20250514").is_some());
    }

    #[test]
    fn test_lookup_fuzzy_threshold() {
        let map = sample_map();
        assert!(lookup_in_map(&map, "claudesonnet4").is_some());
        assert!(lookup_in_map(&map, "zzz").is_none());
    }

    #[test]
    fn test_strip_date_suffix() {
        assert_eq!(strip_date_suffix("model-0514"), "model");
        assert_eq!(strip_date_suffix("model-20250514"), "model");
        assert_eq!(strip_date_suffix("model-v2"), "model-v2");
        assert_eq!(strip_date_suffix("model-9999"), "model-9999");
    }

    #[test]
    fn test_fuzzy_score() {
        assert_eq!(fuzzy_score("abc", "abc"), 6);
        assert_eq!(fuzzy_score("ab", "abcd"), 4);
        assert_eq!(fuzzy_score("", "abc"), 0);
        assert!(fuzzy_score("gpt4omini", "gpt4o") > 0);
    }
}
