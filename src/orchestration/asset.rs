//! Asset identity, specs and materialization results

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::context::AssetExecutionContext;
use crate::error::{ErrorCode, PipelineError, Result};

/// Path of an asset, displayed as `a/b/c`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetKey(Vec<String>);

impl AssetKey {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(path.into_iter().map(Into::into).collect())
    }

    /// Key with `prefix` segments in front of `name`
    pub fn with_prefix(prefix: &[&str], name: &str) -> Self {
        Self::new(prefix.iter().copied().chain(std::iter::once(name)))
    }

    pub fn path(&self) -> &[String] {
        &self.0
    }

    /// Last segment
    pub fn name(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Whether every segment of `prefix` leads this key
    pub fn has_prefix(&self, prefix: &[String]) -> bool {
        prefix.len() <= self.0.len() && self.0.iter().zip(prefix).all(|(a, b)| a == b)
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for AssetKey {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s.trim_matches('/').split('/').collect();
        if segments.iter().any(|seg| seg.trim().is_empty()) {
            return Err(PipelineError::orchestration_with_code(
                ErrorCode::ORCH_ASSET_NOT_FOUND,
                format!("'{}' is not a valid asset key", s),
            ));
        }
        Ok(Self::new(segments))
    }
}

impl TryFrom<String> for AssetKey {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<AssetKey> for String {
    fn from(key: AssetKey) -> Self {
        key.to_string()
    }
}

/// Static description of an asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    pub key: AssetKey,
    #[serde(default)]
    pub deps: Vec<AssetKey>,
    pub compute_kind: Option<String>,
    pub group: Option<String>,
    pub description: Option<String>,
}

impl AssetSpec {
    pub fn new(key: AssetKey) -> Self {
        Self {
            key,
            deps: Vec::new(),
            compute_kind: None,
            group: None,
            description: None,
        }
    }

    pub fn with_dep(mut self, dep: AssetKey) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn with_compute_kind(mut self, kind: impl Into<String>) -> Self {
        self.compute_kind = Some(kind.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A value attached to a materialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MetadataValue {
    Int(i64),
    Float(f64),
    Text(String),
    Markdown(String),
    Url(String),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) | Self::Markdown(v) | Self::Url(v) => write!(f, "{}", v),
        }
    }
}

/// Output of one successful materialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterializeResult {
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl MaterializeResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: MetadataValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }
}

/// A materializable asset
#[async_trait]
pub trait Asset: Send + Sync {
    fn spec(&self) -> &AssetSpec;

    async fn materialize(&self, ctx: &AssetExecutionContext) -> Result<MaterializeResult>;
}
