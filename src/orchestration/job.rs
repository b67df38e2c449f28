//! Asset selections and jobs

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::asset::{AssetKey, AssetSpec};
use super::partitions::DailyPartitionsDefinition;

/// Which assets a job materializes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetSelection {
    All,
    Keys(Vec<AssetKey>),
    KeyPrefixes(Vec<Vec<String>>),
    Groups(Vec<String>),
}

impl AssetSelection {
    /// Select every asset whose key starts with `prefix`
    pub fn key_prefix(prefix: &[&str]) -> Self {
        Self::KeyPrefixes(vec![prefix.iter().map(|s| s.to_string()).collect()])
    }

    pub fn groups(groups: &[&str]) -> Self {
        Self::Groups(groups.iter().map(|s| s.to_string()).collect())
    }

    pub fn matches(&self, spec: &AssetSpec) -> bool {
        match self {
            Self::All => true,
            Self::Keys(keys) => keys.contains(&spec.key),
            Self::KeyPrefixes(prefixes) => prefixes.iter().any(|p| spec.key.has_prefix(p)),
            Self::Groups(groups) => spec
                .group
                .as_ref()
                .is_some_and(|group| groups.contains(group)),
        }
    }

    /// Keys of the matching specs
    pub fn resolve<'a>(&self, specs: impl IntoIterator<Item = &'a AssetSpec>) -> BTreeSet<AssetKey> {
        specs
            .into_iter()
            .filter(|spec| self.matches(spec))
            .map(|spec| spec.key.clone())
            .collect()
    }
}

/// A named selection of assets, optionally partitioned
#[derive(Debug, Clone)]
pub struct AssetJob {
    pub name: String,
    pub selection: AssetSelection,
    pub partitions: Option<DailyPartitionsDefinition>,
    pub description: Option<String>,
}

impl AssetJob {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

pub fn define_asset_job(
    name: impl Into<String>,
    selection: AssetSelection,
    partitions: Option<DailyPartitionsDefinition>,
) -> AssetJob {
    AssetJob {
        name: name.into(),
        selection,
        partitions,
        description: None,
    }
}
