// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Command-line driver for the resource lifecycle.
//!
//! The driver stands in for a provider host: it reads declared state from a
//! TOML file, invokes one lifecycle operation and prints the result as JSON.
//! It does not persist identities; they are passed on the command line.

use std::path::{Path, PathBuf};

use owo_colors::OwoColorize;
use serde_json::json;
use thiserror::Error;

use crate::catalog::Warehouse;
use crate::error::ProviderError;
use crate::id::SchemaGroupId;
use crate::resource::Resource;
use crate::schema_group_privilege::{SchemaGroupPrivilege, SchemaGroupPrivilegeResource};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {}", .path.display(), .source)]
    Declaration {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("failed to render output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// A hint for the user, if there is an obvious next step.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Provider(ProviderError::NoPrivileges) => {
                Some("set at least one of select, insert, update, delete or references to true")
            }
            CliError::Provider(ProviderError::InvalidId(_)) => {
                Some("ids have the form <schema_id>_<group_id>, e.g. 100233_101")
            }
            CliError::Provider(ProviderError::ImmutableField { .. }) => {
                Some("delete the resource and create it with the new schema_id or group_id")
            }
            CliError::Provider(ProviderError::Config(_)) => {
                Some("check profiles.toml or pass --profiles-file")
            }
            _ => None,
        }
    }
}

/// Prints an error with its hint to stderr and exits with status 1.
pub fn display_error(error: &CliError) -> ! {
    eprintln!("{}: {}", "error".bright_red().bold(), error);
    if let Some(hint) = error.hint() {
        eprintln!("  {} {}", "hint:".bright_blue().bold(), hint);
    }
    std::process::exit(1);
}

/// One lifecycle operation, as requested on the command line.
#[derive(Debug, Clone)]
pub enum Operation {
    Exists(SchemaGroupId),
    Create(SchemaGroupPrivilege),
    Read(SchemaGroupId),
    Update(SchemaGroupId, SchemaGroupPrivilege),
    Delete(SchemaGroupId),
    Import(SchemaGroupId),
}

/// Reads declared state from a TOML file.
pub fn load_declaration(path: &Path) -> Result<SchemaGroupPrivilege, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| CliError::Declaration {
        path: path.to_path_buf(),
        source,
    })
}

/// Renders the resource schema.
pub fn schema() -> Result<serde_json::Value, CliError> {
    Ok(serde_json::to_value(SchemaGroupPrivilegeResource.schema())?)
}

/// Runs `operation` against `warehouse` and returns the JSON to print.
pub async fn run(
    warehouse: &mut dyn Warehouse,
    operation: Operation,
) -> Result<serde_json::Value, CliError> {
    let resource = SchemaGroupPrivilegeResource;
    let output = match operation {
        Operation::Exists(id) => {
            let exists = resource.exists(warehouse, id).await?;
            json!({ "id": id, "exists": exists })
        }
        Operation::Create(desired) => {
            let (id, state) = resource.create(warehouse, &desired).await?;
            json!({ "id": id, "state": state })
        }
        Operation::Read(id) => {
            let state = resource.read(warehouse, id).await?;
            json!({ "id": id, "state": state })
        }
        Operation::Update(id, desired) => {
            let state = resource.update(warehouse, id, &desired).await?;
            json!({ "id": id, "state": state })
        }
        Operation::Delete(id) => {
            resource.delete(warehouse, id).await?;
            json!({ "id": id, "deleted": true })
        }
        Operation::Import(id) => serde_json::to_value(resource.import(warehouse, id).await?)?,
    };
    Ok(output)
}
