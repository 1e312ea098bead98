// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The warehouse interface the reconciler runs against.

use async_trait::async_trait;
use tracing::warn;

use crate::error::ProviderError;
use crate::id::SchemaGroupId;

/// A default-ACL catalog row for tables in a schema that mentions a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultAclRow {
    /// Name of the group the row was matched against.
    pub group_name: String,
    /// The `defaclacl` array flattened with [`crate::acl::ACL_SEPARATOR`].
    pub acl: String,
}

/// A source of catalog transactions.
#[async_trait]
pub trait Warehouse: Send {
    /// Opens a transaction. Dropping the returned transaction without
    /// committing rolls it back.
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn CatalogTransaction + 'a>, ProviderError>;
}

/// Catalog reads and statement execution within one transaction.
#[async_trait]
pub trait CatalogTransaction: Send {
    /// Returns the name of the schema with oid `schema_id`.
    async fn schema_name(&mut self, schema_id: u32) -> Result<Option<String>, ProviderError>;

    /// Returns the name of the group with id `group_id`.
    async fn group_name(&mut self, group_id: u32) -> Result<Option<String>, ProviderError>;

    /// Returns the table default-ACL rows of the identified schema whose ACL
    /// mentions the identified group.
    async fn default_table_acls(
        &mut self,
        id: SchemaGroupId,
    ) -> Result<Vec<DefaultAclRow>, ProviderError>;

    async fn execute(&mut self, statement: &str) -> Result<(), ProviderError>;

    async fn commit(self: Box<Self>) -> Result<(), ProviderError>;

    async fn rollback(self: Box<Self>) -> Result<(), ProviderError>;
}

/// Commits `txn` if `result` is `Ok`, rolls it back otherwise.
///
/// A failed rollback is logged and the original error returned.
pub async fn finish<T>(
    txn: Box<dyn CatalogTransaction + '_>,
    result: Result<T, ProviderError>,
) -> Result<T, ProviderError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                warn!(error = %rollback_err, "failed to roll back transaction");
            }
            Err(e)
        }
    }
}
