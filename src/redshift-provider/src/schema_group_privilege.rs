// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `redshift_schema_group_privilege` resource.
//!
//! Privileges are applied twice: with `GRANT ... ON ALL TABLES IN SCHEMA` for
//! the tables that exist today, and with `ALTER DEFAULT PRIVILEGES IN SCHEMA`
//! for tables created later. Both statements run in one transaction so the
//! two never diverge. Live state is read back from `pg_default_acl`, so what
//! the resource reports is the default privileges of the group.
//!
//! The `schema_id` and `group_id` attributes form the identity and cannot be
//! updated in place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::acl::{self, Privileges};
use crate::catalog::{self, CatalogTransaction, Warehouse};
use crate::error::ProviderError;
use crate::id::SchemaGroupId;
use crate::resource::{Attribute, ImportedResource, Resource, ResourceSchema};
use crate::sql::{Action, PrivilegeStatement};

pub const TYPE_NAME: &str = "redshift_schema_group_privilege";

/// Declared and refreshed state of the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaGroupPrivilege {
    pub schema_id: u32,
    pub group_id: u32,
    #[serde(default)]
    pub select: bool,
    #[serde(default)]
    pub insert: bool,
    #[serde(default)]
    pub update: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub references: bool,
}

impl SchemaGroupPrivilege {
    pub fn new(id: SchemaGroupId, privileges: Privileges) -> Self {
        SchemaGroupPrivilege {
            schema_id: id.schema_id,
            group_id: id.group_id,
            select: privileges.contains(Privileges::SELECT),
            insert: privileges.contains(Privileges::INSERT),
            update: privileges.contains(Privileges::UPDATE),
            delete: privileges.contains(Privileges::DELETE),
            references: privileges.contains(Privileges::REFERENCES),
        }
    }

    pub fn id(&self) -> SchemaGroupId {
        SchemaGroupId::new(self.schema_id, self.group_id)
    }

    pub fn privileges(&self) -> Privileges {
        Privileges::from_flags(
            self.select,
            self.insert,
            self.update,
            self.delete,
            self.references,
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaGroupPrivilegeResource;

#[async_trait]
impl Resource for SchemaGroupPrivilegeResource {
    type Id = SchemaGroupId;
    type State = SchemaGroupPrivilege;

    fn schema(&self) -> ResourceSchema {
        ResourceSchema {
            type_name: TYPE_NAME,
            attributes: vec![
                Attribute::required_int("schema_id").force_new(),
                Attribute::required_int("group_id").force_new(),
                Attribute::optional_bool("select", false),
                Attribute::optional_bool("insert", false),
                Attribute::optional_bool("update", false),
                Attribute::optional_bool("delete", false),
                Attribute::optional_bool("references", false),
            ],
        }
    }

    async fn exists(
        &self,
        warehouse: &mut dyn Warehouse,
        id: SchemaGroupId,
    ) -> Result<bool, ProviderError> {
        let mut txn = warehouse.begin().await?;
        let result = read_privileges(&mut *txn, id)
            .await
            .map(|privileges| privileges.is_some());
        catalog::finish(txn, result).await
    }

    async fn create(
        &self,
        warehouse: &mut dyn Warehouse,
        desired: &SchemaGroupPrivilege,
    ) -> Result<(SchemaGroupId, SchemaGroupPrivilege), ProviderError> {
        let privileges = desired.privileges();
        if privileges.is_empty() {
            return Err(ProviderError::NoPrivileges);
        }
        let id = desired.id();

        let mut txn = warehouse.begin().await?;
        let result = create_in(&mut *txn, id, privileges).await;
        let privileges = catalog::finish(txn, result).await?;

        info!(%id, privileges = %privileges.to_keywords(), "created default privileges");
        Ok((id, SchemaGroupPrivilege::new(id, privileges)))
    }

    async fn read(
        &self,
        warehouse: &mut dyn Warehouse,
        id: SchemaGroupId,
    ) -> Result<Option<SchemaGroupPrivilege>, ProviderError> {
        let mut txn = warehouse.begin().await?;
        let result = read_privileges(&mut *txn, id).await;
        let privileges = catalog::finish(txn, result).await?;
        Ok(privileges.map(|privileges| SchemaGroupPrivilege::new(id, privileges)))
    }

    async fn update(
        &self,
        warehouse: &mut dyn Warehouse,
        id: SchemaGroupId,
        desired: &SchemaGroupPrivilege,
    ) -> Result<SchemaGroupPrivilege, ProviderError> {
        if desired.schema_id != id.schema_id {
            return Err(ProviderError::ImmutableField {
                field: "schema_id",
                from: id.schema_id,
                to: desired.schema_id,
            });
        }
        if desired.group_id != id.group_id {
            return Err(ProviderError::ImmutableField {
                field: "group_id",
                from: id.group_id,
                to: desired.group_id,
            });
        }
        let privileges = desired.privileges();
        if privileges.is_empty() {
            return Err(ProviderError::NoPrivileges);
        }

        let mut txn = warehouse.begin().await?;
        let result = update_in(&mut *txn, id, privileges).await;
        let privileges = catalog::finish(txn, result).await?;

        info!(%id, privileges = %privileges.to_keywords(), "updated default privileges");
        Ok(SchemaGroupPrivilege::new(id, privileges))
    }

    async fn delete(
        &self,
        warehouse: &mut dyn Warehouse,
        id: SchemaGroupId,
    ) -> Result<(), ProviderError> {
        let mut txn = warehouse.begin().await?;
        let result = delete_in(&mut *txn, id).await;
        catalog::finish(txn, result).await
    }

    async fn import(
        &self,
        warehouse: &mut dyn Warehouse,
        id: SchemaGroupId,
    ) -> Result<Vec<ImportedResource<SchemaGroupId, SchemaGroupPrivilege>>, ProviderError> {
        match self.read(warehouse, id).await? {
            Some(state) => Ok(vec![ImportedResource { id, state }]),
            None => Err(ProviderError::NotFound(id)),
        }
    }
}

async fn create_in(
    txn: &mut dyn CatalogTransaction,
    id: SchemaGroupId,
    privileges: Privileges,
) -> Result<Privileges, ProviderError> {
    let (schema, group) = resolve_names(txn, id).await?;
    apply(txn, Action::Grant, privileges, &schema, &group).await?;
    confirm(txn, id).await
}

async fn update_in(
    txn: &mut dyn CatalogTransaction,
    id: SchemaGroupId,
    desired: Privileges,
) -> Result<Privileges, ProviderError> {
    let (schema, group) = resolve_names(txn, id).await?;
    let live = read_privileges(txn, id)
        .await?
        .unwrap_or_else(Privileges::empty);
    let to_grant = desired.difference(live);
    let to_revoke = live.difference(desired);
    debug!(
        %id,
        grant = %to_grant.to_keywords(),
        revoke = %to_revoke.to_keywords(),
        "computed privilege changes"
    );

    apply(txn, Action::Grant, to_grant, &schema, &group).await?;
    apply(txn, Action::Revoke, to_revoke, &schema, &group).await?;
    confirm(txn, id).await
}

async fn delete_in(
    txn: &mut dyn CatalogTransaction,
    id: SchemaGroupId,
) -> Result<(), ProviderError> {
    let schema = txn.schema_name(id.schema_id).await?;
    let group = txn.group_name(id.group_id).await?;
    let (Some(schema), Some(group)) = (schema, group) else {
        warn!(%id, "schema or group no longer exists, nothing to revoke");
        return Ok(());
    };

    apply(txn, Action::Revoke, Privileges::all(), &schema, &group).await?;

    match read_privileges(txn, id).await {
        Ok(Some(remaining)) if !remaining.is_empty() => Err(ProviderError::ReadVerification {
            id,
            source: Box::new(ProviderError::PrivilegesRemain {
                id,
                remaining: remaining.to_keywords(),
            }),
        }),
        Ok(_) => {
            info!(%id, "revoked default privileges");
            Ok(())
        }
        Err(e) => Err(ProviderError::ReadVerification {
            id,
            source: Box::new(e),
        }),
    }
}

async fn resolve_names(
    txn: &mut dyn CatalogTransaction,
    id: SchemaGroupId,
) -> Result<(String, String), ProviderError> {
    let schema = txn
        .schema_name(id.schema_id)
        .await?
        .ok_or(ProviderError::SchemaNotFound(id.schema_id))?;
    let group = txn
        .group_name(id.group_id)
        .await?
        .ok_or(ProviderError::GroupNotFound(id.group_id))?;
    Ok((schema, group))
}

async fn apply(
    txn: &mut dyn CatalogTransaction,
    action: Action,
    privileges: Privileges,
    schema: &str,
    group: &str,
) -> Result<(), ProviderError> {
    if privileges.is_empty() {
        return Ok(());
    }
    for statement in PrivilegeStatement::pair(action, privileges, schema, group) {
        let statement = statement.to_string();
        info!(%statement, "executing");
        txn.execute(&statement).await?;
    }
    Ok(())
}

/// Reads the group's default table privileges, merging every matching row.
async fn read_privileges(
    txn: &mut dyn CatalogTransaction,
    id: SchemaGroupId,
) -> Result<Option<Privileges>, ProviderError> {
    let mut found: Option<Privileges> = None;
    for row in txn.default_table_acls(id).await? {
        let items = acl::parse_acl(&row.acl)?;
        if let Some(privileges) = acl::group_privileges(&items, &row.group_name) {
            found = Some(found.unwrap_or_else(Privileges::empty) | privileges);
        }
    }
    debug!(%id, privileges = ?found, "read default privileges");
    Ok(found)
}

/// Reads back the state after a write within the same transaction.
async fn confirm(
    txn: &mut dyn CatalogTransaction,
    id: SchemaGroupId,
) -> Result<Privileges, ProviderError> {
    match read_privileges(txn, id).await {
        Ok(Some(privileges)) => Ok(privileges),
        Ok(None) => Err(ProviderError::ReadVerification {
            id,
            source: Box::new(ProviderError::NotFound(id)),
        }),
        Err(e) => Err(ProviderError::ReadVerification {
            id,
            source: Box::new(e),
        }),
    }
}
