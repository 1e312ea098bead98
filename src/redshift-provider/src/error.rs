// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

use crate::acl::AclParseError;
use crate::config::ConfigError;
use crate::id::{IdParseError, SchemaGroupId};

/// Errors surfaced to the host by lifecycle operations.
///
/// None of these are retried internally.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        source: tokio_postgres::Error,
    },
    #[error("{}", format_query_error(.0))]
    Query(#[from] tokio_postgres::Error),
    #[error(transparent)]
    InvalidId(#[from] IdParseError),
    #[error("invalid default acl: {0}")]
    InvalidAcl(#[from] AclParseError),
    /// The declared state has every privilege flag set to false.
    #[error(
        "no privileges specified: at least one of select, insert, update, delete or references must be true"
    )]
    NoPrivileges,
    #[error("schema with id {0} not found")]
    SchemaNotFound(u32),
    #[error("group with id {0} not found")]
    GroupNotFound(u32),
    #[error("failed to execute '{statement}': {source}")]
    Statement {
        statement: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// The state read back after a write did not confirm the write. The
    /// transaction has been rolled back.
    #[error("failed to confirm privileges for {id}: {source}")]
    ReadVerification {
        id: SchemaGroupId,
        source: Box<ProviderError>,
    },
    #[error("no default privileges found for {0}")]
    NotFound(SchemaGroupId),
    #[error("default privileges remain for {id} after revoke: {remaining}")]
    PrivilegesRemain {
        id: SchemaGroupId,
        remaining: String,
    },
    #[error("{field} cannot be changed in place (from {from} to {to})")]
    ImmutableField {
        field: &'static str,
        from: u32,
        to: u32,
    },
}

fn format_query_error(error: &tokio_postgres::Error) -> String {
    if let Some(db_error) = error.as_db_error() {
        let mut parts = vec![format!("database error: {}", db_error.message())];

        if let Some(detail) = db_error.detail() {
            parts.push(format!("  Detail: {}", detail));
        }

        if let Some(hint) = db_error.hint() {
            parts.push(format!("  Hint: {}", hint));
        }

        parts.push(format!("  Code: {:?}", db_error.code()));
        parts.join("\n")
    } else {
        format!("query error: {}", error)
    }
}
