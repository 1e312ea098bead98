// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A [`Warehouse`] backed by a `tokio-postgres` connection.

use async_trait::async_trait;
use tokio_postgres::{Client as PgClient, NoTls, Transaction};
use tracing::{debug, info, warn};

use crate::catalog::{CatalogTransaction, DefaultAclRow, Warehouse};
use crate::config::Profile;
use crate::error::ProviderError;
use crate::id::SchemaGroupId;

const SCHEMA_NAME_QUERY: &str = r#"
    SELECT nspname
    FROM pg_catalog.pg_namespace
    WHERE oid::bigint = $1
"#;

const GROUP_NAME_QUERY: &str = r#"
    SELECT groname
    FROM pg_catalog.pg_group
    WHERE grosysid::bigint = $1
"#;

// Every default table ACL of the schema is returned with the group's name;
// callers decode the ACL to find the group's own entry, which may be quoted.
const DEFAULT_TABLE_ACLS_QUERY: &str = r#"
    SELECT
        pu.groname AS group_name,
        array_to_string(acl.defaclacl, '|') AS acl
    FROM pg_catalog.pg_default_acl acl
    JOIN pg_catalog.pg_namespace nsp ON acl.defaclnamespace = nsp.oid
    CROSS JOIN pg_catalog.pg_group pu
    WHERE acl.defaclobjtype = 'r'
        AND nsp.oid::bigint = $1
        AND pu.grosysid::bigint = $2
"#;

/// A connection to a Redshift cluster.
pub struct Client {
    client: PgClient,
    profile: Profile,
}

impl Client {
    /// Connects using the given profile.
    ///
    /// The connection task is spawned onto the current tokio runtime and
    /// lives as long as the returned client.
    pub async fn connect(profile: Profile) -> Result<Self, ProviderError> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&profile.host)
            .port(profile.port)
            .dbname(&profile.database)
            .application_name("redshift-provider")
            .connect_timeout(profile.connect_timeout());
        if let Some(username) = &profile.username {
            config.user(username);
        }
        if let Some(password) = &profile.password {
            config.password(password);
        }

        let (client, connection) =
            config
                .connect(NoTls)
                .await
                .map_err(|source| ProviderError::Connect {
                    host: profile.host.clone(),
                    port: profile.port,
                    source,
                })?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "connection error");
            }
        });

        info!(
            profile = %profile.name,
            host = %profile.host,
            port = profile.port,
            database = %profile.database,
            "connected"
        );

        Ok(Client { client, profile })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Returns the server version and the current user.
    pub async fn server_info(&self) -> Result<(String, String), ProviderError> {
        let row = self
            .client
            .query_one("SELECT version() AS version, current_user AS role", &[])
            .await?;
        Ok((row.get("version"), row.get("role")))
    }
}

#[async_trait]
impl Warehouse for Client {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn CatalogTransaction + 'a>, ProviderError> {
        let txn = self.client.transaction().await?;
        Ok(Box::new(PgTransaction { txn }))
    }
}

/// Dropping a [`Transaction`] without committing rolls it back.
struct PgTransaction<'a> {
    txn: Transaction<'a>,
}

#[async_trait]
impl CatalogTransaction for PgTransaction<'_> {
    async fn schema_name(&mut self, schema_id: u32) -> Result<Option<String>, ProviderError> {
        let row = self
            .txn
            .query_opt(SCHEMA_NAME_QUERY, &[&i64::from(schema_id)])
            .await?;
        Ok(row.map(|row| row.get("nspname")))
    }

    async fn group_name(&mut self, group_id: u32) -> Result<Option<String>, ProviderError> {
        let row = self
            .txn
            .query_opt(GROUP_NAME_QUERY, &[&i64::from(group_id)])
            .await?;
        Ok(row.map(|row| row.get("groname")))
    }

    async fn default_table_acls(
        &mut self,
        id: SchemaGroupId,
    ) -> Result<Vec<DefaultAclRow>, ProviderError> {
        let rows = self
            .txn
            .query(
                DEFAULT_TABLE_ACLS_QUERY,
                &[&i64::from(id.schema_id), &i64::from(id.group_id)],
            )
            .await?;
        debug!(%id, rows = rows.len(), "queried default acls");
        Ok(rows
            .iter()
            .map(|row| DefaultAclRow {
                group_name: row.get("group_name"),
                acl: row.get("acl"),
            })
            .collect())
    }

    async fn execute(&mut self, statement: &str) -> Result<(), ProviderError> {
        self.txn
            .batch_execute(statement)
            .await
            .map_err(|e| ProviderError::Statement {
                statement: statement.to_string(),
                source: Box::new(e),
            })
    }

    async fn commit(self: Box<Self>) -> Result<(), ProviderError> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ProviderError> {
        self.txn.rollback().await?;
        Ok(())
    }
}
