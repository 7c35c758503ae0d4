//! The optional TOML config file.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[cfg_attr(test, serde(deny_unknown_fields))]
pub struct Config {
    pub(crate) flags: Option<ConfigFlags>,
    pub(crate) tools: Option<ToolsConfig>,
}

/// Config equivalents of the command line flags.
#[derive(Clone, Debug, Default, Deserialize)]
#[cfg_attr(test, serde(deny_unknown_fields), derive(PartialEq, Eq))]
pub(crate) struct ConfigFlags {
    pub(crate) force: Option<bool>,
    pub(crate) thin: Option<bool>,
    pub(crate) kernel_threads: Option<bool>,
    pub(crate) basename: Option<bool>,
    pub(crate) rate: Option<StringOrNum>,
    pub(crate) rescan_rate: Option<StringOrNum>,
}

/// Overrides for the external tool command lines. `{pid}` is replaced with the selected pid.
#[derive(Clone, Debug, Default, Deserialize)]
#[cfg_attr(test, serde(deny_unknown_fields), derive(PartialEq, Eq))]
pub(crate) struct ToolsConfig {
    pub(crate) list_open_files: Option<String>,
    pub(crate) trace: Option<String>,
    pub(crate) debugger: Option<String>,
}

/// A duration given either as milliseconds or as a human-readable string like `"2s"`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum StringOrNum {
    String(String),
    Num(u64),
}

impl From<String> for StringOrNum {
    fn from(value: String) -> Self {
        StringOrNum::String(value)
    }
}

impl From<u64> for StringOrNum {
    fn from(value: u64) -> Self {
        StringOrNum::Num(value)
    }
}
