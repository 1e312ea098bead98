// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Connection profiles.
//!
//! Profiles are read from a `profiles.toml` file:
//!
//! ```toml
//! default_profile = "dev"
//!
//! [profiles.dev]
//! host = "example.redshift.amazonaws.com"
//! port = 5439
//! database = "dev"
//! username = "admin"
//! password = "${REDSHIFT_PASSWORD}"
//! ```
//!
//! `${VAR}` references in string fields are expanded from the environment
//! when a profile is selected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const PROFILES_FILE: &str = "profiles.toml";
pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_PORT: u16 = 5439;
pub const DEFAULT_DATABASE: &str = "dev";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("profile '{0}' not found")]
    ProfileNotFound(String),
    #[error("environment variable '{var}' referenced by profile '{profile}' is not set")]
    MissingEnvVar { profile: String, var: String },
    #[error("unterminated '${{' in profile '{profile}'")]
    UnterminatedVar { profile: String },
}

/// Connection parameters for one warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    #[serde(skip)]
    pub name: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database")]
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout_secs: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

impl Profile {
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilesConfig {
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl ProfilesConfig {
    /// Loads `profiles.toml` from `path`, or from the current directory.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(PROFILES_FILE));
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Loads the profiles file and selects a profile, with environment
    /// variables expanded.
    pub fn load_profile(path: Option<&Path>, name: Option<&str>) -> Result<Profile, ConfigError> {
        let config = Self::load(path)?;
        let profile = config.get_profile(name)?;
        profile.expand_env_vars(|var| std::env::var(var).ok())
    }

    /// Selects `name`, else the configured default, else the profile named
    /// `default`.
    pub fn get_profile(&self, name: Option<&str>) -> Result<Profile, ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or(DEFAULT_PROFILE);
        let mut profile = self
            .profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::ProfileNotFound(name.to_string()))?;
        profile.name = name.to_string();
        Ok(profile)
    }
}

impl Profile {
    /// Replaces `${VAR}` references in the string fields using `lookup`.
    pub fn expand_env_vars<F>(mut self, lookup: F) -> Result<Profile, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = self.name.clone();
        let expand = |value: &str| expand_vars(value, &name, &lookup);
        self.host = expand(&self.host)?;
        self.database = expand(&self.database)?;
        self.username = self.username.as_deref().map(expand).transpose()?;
        self.password = self.password.as_deref().map(expand).transpose()?;
        Ok(self)
    }
}

fn expand_vars<F>(value: &str, profile: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| ConfigError::UnterminatedVar {
            profile: profile.to_string(),
        })?;
        let var = &after[..end];
        let resolved = lookup(var).ok_or_else(|| ConfigError::MissingEnvVar {
            profile: profile.to_string(),
            var: var.to_string(),
        })?;
        out.push_str(&resolved);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
