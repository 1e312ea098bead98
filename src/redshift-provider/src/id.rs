// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Persisted resource identity.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

const SEPARATOR: char = '_';

/// Identifies a schema/group privilege resource.
///
/// Format: `<schema_id>_<group_id>`, where both components are unsigned
/// decimal integers without sign or padding characters other than digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaGroupId {
    /// The oid of the schema in `pg_namespace`.
    pub schema_id: u32,
    /// The `grosysid` of the group in `pg_group`.
    pub group_id: u32,
}

impl SchemaGroupId {
    pub fn new(schema_id: u32, group_id: u32) -> Self {
        Self {
            schema_id,
            group_id,
        }
    }
}

impl fmt::Display for SchemaGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.schema_id, SEPARATOR, self.group_id)
    }
}

impl Serialize for SchemaGroupId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An error parsing a [`SchemaGroupId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("invalid id '{id}': expected <schema_id>_<group_id>")]
    MissingSeparator { id: String },
    #[error("invalid id '{id}': {component} '{value}' is not an unsigned 32-bit integer")]
    InvalidComponent {
        id: String,
        component: &'static str,
        value: String,
    },
}

impl FromStr for SchemaGroupId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (schema, group) =
            s.split_once(SEPARATOR)
                .ok_or_else(|| IdParseError::MissingSeparator { id: s.to_string() })?;

        let parse = |component: &'static str, value: &str| {
            // `u32::from_str` accepts a leading '+', which would break the
            // round trip back to the persisted form.
            if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
                return Err(IdParseError::InvalidComponent {
                    id: s.to_string(),
                    component,
                    value: value.to_string(),
                });
            }
            value
                .parse::<u32>()
                .map_err(|_| IdParseError::InvalidComponent {
                    id: s.to_string(),
                    component,
                    value: value.to_string(),
                })
        };

        Ok(SchemaGroupId {
            schema_id: parse("schema_id", schema)?,
            group_id: parse("group_id", group)?,
        })
    }
}
