//! Declared tool parameters and argument validation

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use reactant_config::ParamConfig;

/// String-keyed tool arguments
pub type Arguments = BTreeMap<String, String>;

/// One declared parameter. A parameter with a default is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub default: Option<String>,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default: None,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        description: impl Into<String>,
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            default: Some(default.into()),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl From<&ParamConfig> for ParamSpec {
    fn from(config: &ParamConfig) -> Self {
        Self {
            name: config.name.clone(),
            description: config.description.clone(),
            default: config.default.clone(),
        }
    }
}

/// Parameters a tool accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<ParamSpec>,
}

impl Signature {
    pub fn new(params: Vec<ParamSpec>) -> Self {
        Self { params }
    }

    /// A signature taking no arguments
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn required_names(&self) -> BTreeSet<&str> {
        self.params
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
            .collect()
    }

    pub fn all_names(&self) -> BTreeSet<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    /// Check proposed arguments against the declared parameters.
    ///
    /// Fails only when a required parameter is missing. Unknown arguments are
    /// dropped from the returned map; optional parameters are not filled in.
    pub fn validate(&self, args: &Arguments) -> Result<Arguments, ArgumentMismatch> {
        let required = self.required_names();
        let all = self.all_names();

        let missing: Vec<String> = required
            .into_iter()
            .filter(|name| !args.contains_key(*name))
            .map(String::from)
            .collect();
        let extra: Vec<String> = args
            .keys()
            .filter(|key| !all.contains(key.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(ArgumentMismatch { missing, extra });
        }

        Ok(args
            .iter()
            .filter(|(key, _)| all.contains(key.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Argument value, or the parameter's default when absent
    pub fn value_or_default(&self, args: &Arguments, name: &str) -> Option<String> {
        args.get(name)
            .cloned()
            .or_else(|| self.param(name).and_then(|p| p.default.clone()))
    }
}

impl From<&[ParamConfig]> for Signature {
    fn from(params: &[ParamConfig]) -> Self {
        Self::new(params.iter().map(ParamSpec::from).collect())
    }
}

/// Why proposed arguments were rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentMismatch {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl fmt::Display for ArgumentMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Missing parameters: {}.", self.missing.join(", "))?;
        if !self.extra.is_empty() {
            write!(f, " Unexpected parameters: {}.", self.extra.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ArgumentMismatch {}
