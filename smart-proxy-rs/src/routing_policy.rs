//! # Routing Policy
//!
//! Maps a request's declared intent (privacy level, cost tier, research flag, prompt shape)
//! to a backend selection. `RoutingPolicy::decide` does no I/O and is deterministic: the same
//! inputs always yield an identical `RoutingDecision`.
//!
//! Precedence, first match wins:
//! 1. `privacy_level = high`: local, no live search, `max_loops = 0`
//! 2. `research_requested`: remote, live search; `max_loops = 1` on the low cost tier
//! 3. `max_cost_tier = low`: local, `max_loops = 0`
//! 4. structured prompt (Markdown headings): remote, no live search
//! 5. anything else: local, `max_loops = 0`

use std::fmt;
use std::str::FromStr;

use backend_sdk::BackendKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Version tag stamped on every decision
pub const POLICY_VERSION: &str = "2024-06-01.1";

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^ {0,3}#{1,6}[ \t]+\S").expect("heading pattern"));

/// Declared privacy requirement of a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum PrivacyLevel {
    Low,
    #[default]
    Standard,
    High,
}

/// Highest cost tier the caller accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum CostTier {
    Low,
    #[default]
    Standard,
    High,
}

fn parse_level(value: &str) -> Option<u8> {
    match value.trim().to_ascii_lowercase().as_str() {
        "low" => Some(0),
        "" | "standard" | "medium" | "normal" | "default" => Some(1),
        "high" => Some(2),
        _ => None,
    }
}

macro_rules! level_enum_impls {
    ($ty:ident, $what:literal) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match parse_level(s) {
                    Some(0) => Ok($ty::Low),
                    Some(1) => Ok($ty::Standard),
                    Some(_) => Ok($ty::High),
                    None => Err(format!("Unknown {}: {}", $what, s)),
                }
            }
        }

        impl TryFrom<String> for $ty {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $ty::Low => "low",
                    $ty::Standard => "standard",
                    $ty::High => "high",
                })
            }
        }
    };
}

level_enum_impls!(PrivacyLevel, "privacy level");
level_enum_impls!(CostTier, "cost tier");

/// Models the policy may hand out, fixed at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTable {
    pub local_model: String,
    pub remote_model: String,
}

/// Inputs to one policy evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteRequest {
    pub prompt: String,
    pub research_requested: bool,
    pub privacy_level: PrivacyLevel,
    pub max_cost_tier: CostTier,
}

impl RouteRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn research(mut self, requested: bool) -> Self {
        self.research_requested = requested;
        self
    }

    pub fn privacy(mut self, level: PrivacyLevel) -> Self {
        self.privacy_level = level;
        self
    }

    pub fn cost(mut self, tier: CostTier) -> Self {
        self.max_cost_tier = tier;
        self
    }
}

/// Result of policy evaluation for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutingDecision {
    pub backend: BackendKind,
    pub model_id: String,
    pub use_live_search: bool,
    /// `None` means unbounded
    pub max_loops: Option<u32>,
    pub reason: String,
    pub policy_version: String,
}

/// The routing policy
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    models: ModelTable,
}

impl RoutingPolicy {
    pub fn new(models: ModelTable) -> Self {
        Self { models }
    }

    pub fn decide(&self, request: &RouteRequest) -> RoutingDecision {
        if request.privacy_level == PrivacyLevel::High {
            return self.local(
                Some(0),
                "privacy_level=high forces the local backend without live search",
            );
        }

        if request.research_requested {
            let (max_loops, reason) = if request.max_cost_tier == CostTier::Low {
                (
                    Some(1),
                    "research requested on the low cost tier: remote with live search, one loop",
                )
            } else {
                (None, "research requested: remote with live search")
            };
            return self.remote(true, max_loops, reason);
        }

        if request.max_cost_tier == CostTier::Low {
            return self.local(Some(0), "max_cost_tier=low forces the local backend");
        }

        if is_structured(&request.prompt) {
            return self.remote(false, None, "structured multi-section prompt: remote backend");
        }

        self.local(Some(0), "simple prompt: local backend")
    }

    fn local(&self, max_loops: Option<u32>, reason: &str) -> RoutingDecision {
        RoutingDecision {
            backend: BackendKind::Local,
            model_id: self.models.local_model.clone(),
            use_live_search: false,
            max_loops,
            reason: reason.to_string(),
            policy_version: POLICY_VERSION.to_string(),
        }
    }

    fn remote(
        &self,
        use_live_search: bool,
        max_loops: Option<u32>,
        reason: &str,
    ) -> RoutingDecision {
        RoutingDecision {
            backend: BackendKind::Remote,
            model_id: self.models.remote_model.clone(),
            use_live_search,
            max_loops,
            reason: reason.to_string(),
            policy_version: POLICY_VERSION.to_string(),
        }
    }
}

/// A prompt is structured when it carries at least one Markdown ATX heading line
pub fn is_structured(prompt: &str) -> bool {
    HEADING.is_match(prompt)
}
