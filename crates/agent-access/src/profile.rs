//! Capability profiles: named bundles of simulated client capabilities.
//!
//! Profiles are data only. Every behavioral difference between profiles comes
//! from how the renderer and the checks read these fields.

use crate::error::{AccessError, AccessResult};
use serde::{Deserialize, Serialize};

/// Simulated client capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityProfile {
    pub id: String,
    pub name: String,
    pub script_enabled: bool,
    pub css_enabled: bool,
    pub images_enabled: bool,
    pub cookies_enabled: bool,
    /// Upper bound on the post-load settle wait; `None` means no wait.
    pub max_script_wait_ms: Option<u64>,
    pub synthetic_user_agent: String,
}

/// Read-only table of profiles, in registration order.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<CapabilityProfile>,
}

impl ProfileRegistry {
    /// Build a registry from an explicit table.
    ///
    /// Rejects an empty table and duplicate ids.
    pub fn new(profiles: Vec<CapabilityProfile>) -> AccessResult<Self> {
        if profiles.is_empty() {
            return Err(AccessError::InvalidConfig(
                "profile registry must not be empty".to_string(),
            ));
        }
        for (i, p) in profiles.iter().enumerate() {
            if p.id.trim().is_empty() {
                return Err(AccessError::InvalidConfig(format!(
                    "profile at position {i} has an empty id"
                )));
            }
            if profiles[..i].iter().any(|q| q.id == p.id) {
                return Err(AccessError::InvalidConfig(format!(
                    "duplicate profile id: {}",
                    p.id
                )));
            }
        }
        Ok(Self { profiles })
    }

    /// The four built-in profiles: basic, intermediate, advanced, crawler.
    pub fn standard() -> Self {
        Self {
            profiles: standard_profiles(),
        }
    }

    /// Look up a profile by id.
    pub fn get(&self, id: &str) -> AccessResult<&CapabilityProfile> {
        self.profiles
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| AccessError::UnknownProfile(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.iter().any(|p| p.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CapabilityProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_profiles() -> Vec<CapabilityProfile> {
    vec![
        CapabilityProfile {
            id: "basic".to_string(),
            name: "Basic agent (no script)".to_string(),
            script_enabled: false,
            css_enabled: false,
            images_enabled: false,
            cookies_enabled: false,
            max_script_wait_ms: None,
            synthetic_user_agent: "AgentAccess-Basic/1.0 (+no-script)".to_string(),
        },
        CapabilityProfile {
            id: "intermediate".to_string(),
            name: "Intermediate agent (script only)".to_string(),
            script_enabled: true,
            css_enabled: false,
            images_enabled: false,
            cookies_enabled: true,
            max_script_wait_ms: Some(2_000),
            synthetic_user_agent: "AgentAccess-Intermediate/1.0".to_string(),
        },
        CapabilityProfile {
            id: "advanced".to_string(),
            name: "Advanced agent (full browser)".to_string(),
            script_enabled: true,
            css_enabled: true,
            images_enabled: true,
            cookies_enabled: true,
            max_script_wait_ms: Some(10_000),
            synthetic_user_agent: "Mozilla/5.0 (compatible; AgentAccess-Advanced/1.0)".to_string(),
        },
        CapabilityProfile {
            id: "crawler".to_string(),
            name: "Search crawler".to_string(),
            script_enabled: true,
            css_enabled: false,
            images_enabled: false,
            cookies_enabled: false,
            max_script_wait_ms: Some(5_000),
            synthetic_user_agent: "AgentAccess-Crawler/1.0 (+bot)".to_string(),
        },
    ]
}
