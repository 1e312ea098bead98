// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Privilege statements.
//!
//! Names are substituted textually. A name is emitted verbatim when it is a
//! plain lower-case identifier and double-quoted otherwise.

use std::fmt;

use crate::acl::Privileges;

/// Whether a statement adds or removes privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Grant,
    Revoke,
}

/// Which tables a statement applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Every table that currently exists in the schema.
    ExistingTables,
    /// Tables created in the schema from now on.
    FutureTables,
}

/// A `GRANT`, `REVOKE` or `ALTER DEFAULT PRIVILEGES` statement for one
/// group on one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeStatement<'a> {
    pub action: Action,
    pub target: Target,
    pub privileges: Privileges,
    pub schema: &'a str,
    pub group: &'a str,
}

impl<'a> PrivilegeStatement<'a> {
    /// The pair of statements that apply `action` to both existing and future
    /// tables, in execution order.
    pub fn pair(
        action: Action,
        privileges: Privileges,
        schema: &'a str,
        group: &'a str,
    ) -> [PrivilegeStatement<'a>; 2] {
        [Target::ExistingTables, Target::FutureTables].map(|target| PrivilegeStatement {
            action,
            target,
            privileges,
            schema,
            group,
        })
    }
}

impl fmt::Display for PrivilegeStatement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (verb, preposition) = match self.action {
            Action::Grant => ("GRANT", "TO"),
            Action::Revoke => ("REVOKE", "FROM"),
        };
        let privileges = self.privileges.to_keywords();
        let schema = Ident(self.schema);
        let group = Ident(self.group);
        match self.target {
            Target::ExistingTables => write!(
                f,
                "{verb} {privileges} ON ALL TABLES IN SCHEMA {schema} {preposition} GROUP {group}"
            ),
            Target::FutureTables => write!(
                f,
                "ALTER DEFAULT PRIVILEGES IN SCHEMA {schema} {verb} {privileges} ON TABLES {preposition} GROUP {group}"
            ),
        }
    }
}

/// An identifier, quoted on display when necessary.
struct Ident<'a>(&'a str);

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = self
            .0
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$');
        if plain {
            f.write_str(self.0)
        } else {
            write!(f, "\"{}\"", self.0.replace('"', "\"\""))
        }
    }
}
