use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Environment variable overriding [`ResolveConfig::related_parents`].
pub const RELATED_PARENTS_ENV: &str = "ORGROOT_RELATED_PARENTS";

/// What the graph builder does with a redirect whose target is not in the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingReferencePolicy {
    /// Fail the run with [`crate::ResolveError::MissingReference`].
    #[default]
    Abort,
    /// Log a warning and treat the row as having no redirect.
    DropRedirect,
}

/// Which traversal feeds a node's related parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationDirection {
    /// Nodes whose redirect chain passes through the node.
    #[default]
    Descendants,
    /// Nodes the node's own redirect chain passes through.
    Successors,
}

impl RelationDirection {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "descendants" => Some(Self::Descendants),
            "successors" => Some(Self::Successors),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResolveConfig {
    #[serde(default)]
    pub on_missing_reference: MissingReferencePolicy,
    #[serde(default)]
    pub related_parents: RelationDirection,
}

/// Load a [`ResolveConfig`] from a TOML file.
///
/// A missing file yields the defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<ResolveConfig> {
    if !path.exists() {
        return Ok(ResolveConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ResolveConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the config file and apply the environment override.
///
/// # Errors
///
/// Returns an error if the file cannot be loaded or the override names an
/// unknown direction.
pub fn resolve_config(path: &Path) -> Result<ResolveConfig> {
    let file = load_config(path)?;
    apply_env_override(file, env::var(RELATED_PARENTS_ENV).ok())
}

fn apply_env_override(mut config: ResolveConfig, raw: Option<String>) -> Result<ResolveConfig> {
    let Some(raw) = raw else {
        return Ok(config);
    };
    if raw.trim().is_empty() {
        return Ok(config);
    }
    let Some(direction) = RelationDirection::parse(&raw) else {
        bail!("invalid {RELATED_PARENTS_ENV} value '{raw}'; expected descendants or successors");
    };
    config.related_parents = direction;
    Ok(config)
}
