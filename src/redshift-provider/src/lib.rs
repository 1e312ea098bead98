// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Default table privileges for Redshift groups.
//!
//! This crate implements the `redshift_schema_group_privilege` resource of an
//! infrastructure-as-code provider. A resource declares which of `SELECT`,
//! `INSERT`, `UPDATE`, `DELETE` and `REFERENCES` a group should hold on the
//! tables of a schema, both the tables that exist today and the ones created
//! later. The reconciler compares that declaration against the
//! `pg_default_acl` catalog and issues `GRANT`, `REVOKE` and
//! `ALTER DEFAULT PRIVILEGES` statements to converge the two.
//!
//! The crate is organized as follows:
//!
//! * [`acl`] decodes catalog ACL strings into typed [`acl::Privileges`].
//! * [`id`] defines the persisted resource identity.
//! * [`sql`] renders the privilege statements.
//! * [`catalog`] defines the transactional warehouse interface the reconciler
//!   runs against, and [`client`] implements it over `tokio-postgres`.
//! * [`resource`] is the host-facing lifecycle contract, implemented for this
//!   resource in [`schema_group_privilege`].
//! * [`config`] loads connection profiles and [`cli`] drives the lifecycle
//!   from the command line.

pub mod acl;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod id;
pub mod resource;
pub mod schema_group_privilege;
pub mod sql;

#[cfg(test)]
mod testing;

pub use error::ProviderError;
pub use id::SchemaGroupId;
pub use schema_group_privilege::{SchemaGroupPrivilege, SchemaGroupPrivilegeResource};
