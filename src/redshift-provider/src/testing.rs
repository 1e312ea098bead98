// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An in-memory warehouse for tests.
//!
//! The fake understands exactly the statements rendered by [`crate::sql`],
//! stages their effects per transaction, and renders `pg_default_acl` rows
//! in the catalog's text form so that reads go through the real decoder.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::acl::{ACL_SEPARATOR, AclItem, Grantee, Privileges};
use crate::catalog::{CatalogTransaction, DefaultAclRow, Warehouse};
use crate::error::ProviderError;
use crate::id::SchemaGroupId;

const OWNER: &str = "admin";

/// The owner's entry as a current server prints it, including letters for
/// privileges the decoder does not manage.
const OWNER_ACL: &str = "admin=arwdRxtDPA/admin";

/// Privileges keyed by (schema name, group name).
type Grants = BTreeMap<(String, String), Privileges>;

#[derive(Debug, Clone, Default)]
struct CatalogState {
    table_grants: Grants,
    default_grants: Grants,
}

#[derive(Debug, Default)]
pub struct FakeWarehouse {
    schemas: BTreeMap<u32, String>,
    groups: BTreeMap<u32, String>,
    state: CatalogState,
    /// Raw aclitems appended to a schema's default ACL, e.g. defaults
    /// created by another owner.
    seeded_acls: BTreeMap<String, Vec<String>>,
    statements: Vec<String>,
    failing: Vec<String>,
    hide_default_acls: bool,
    transactions: usize,
    commits: usize,
    rollbacks: usize,
}

impl FakeWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, id: u32, name: &str) -> Self {
        self.schemas.insert(id, name.to_string());
        self
    }

    pub fn with_group(mut self, id: u32, name: &str) -> Self {
        self.groups.insert(id, name.to_string());
        self
    }

    /// Makes every statement containing `pattern` fail after being logged.
    pub fn fail_statements_containing(&mut self, pattern: &str) {
        self.failing.push(pattern.to_string());
    }

    /// Makes the default-ACL catalog look empty.
    pub fn hide_default_acls(&mut self) {
        self.hide_default_acls = true;
    }

    pub fn seed_default_acl(&mut self, schema: &str, item: &str) {
        self.seeded_acls
            .entry(schema.to_string())
            .or_default()
            .push(item.to_string());
    }

    /// Every statement passed to `execute`, including failed and rolled
    /// back ones.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn clear_statements(&mut self) {
        self.statements.clear();
    }

    pub fn transactions(&self) -> usize {
        self.transactions
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks
    }

    /// Committed privileges on the existing tables of `schema`.
    pub fn table_privileges(&self, schema: &str, group: &str) -> Privileges {
        lookup(&self.state.table_grants, schema, group)
    }

    /// Committed default privileges for future tables of `schema`.
    pub fn default_privileges(&self, schema: &str, group: &str) -> Privileges {
        lookup(&self.state.default_grants, schema, group)
    }

    fn schema_exists(&self, name: &str) -> bool {
        self.schemas.values().any(|schema| schema == name)
    }

    fn group_exists(&self, name: &str) -> bool {
        self.groups.values().any(|group| group == name)
    }
}

fn lookup(grants: &Grants, schema: &str, group: &str) -> Privileges {
    grants
        .get(&(schema.to_string(), group.to_string()))
        .copied()
        .unwrap_or_else(Privileges::empty)
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn begin<'a>(&'a mut self) -> Result<Box<dyn CatalogTransaction + 'a>, ProviderError> {
        self.transactions += 1;
        let staged = self.state.clone();
        Ok(Box::new(FakeTransaction {
            warehouse: self,
            staged,
        }))
    }
}

struct FakeTransaction<'a> {
    warehouse: &'a mut FakeWarehouse,
    staged: CatalogState,
}

impl FakeTransaction<'_> {
    fn apply(&mut self, statement: &str) -> Result<(), String> {
        let tokens = tokenize(statement)?;
        let tokens: Vec<_> = tokens.iter().map(String::as_str).collect();
        let (grants, grant, privileges, schema, group) = match tokens.as_slice() {
            [
                verb @ ("GRANT" | "REVOKE"),
                privileges,
                "ON",
                "ALL",
                "TABLES",
                "IN",
                "SCHEMA",
                schema,
                "TO" | "FROM",
                "GROUP",
                group,
            ] => (
                &mut self.staged.table_grants,
                *verb == "GRANT",
                *privileges,
                *schema,
                *group,
            ),
            [
                "ALTER",
                "DEFAULT",
                "PRIVILEGES",
                "IN",
                "SCHEMA",
                schema,
                verb @ ("GRANT" | "REVOKE"),
                privileges,
                "ON",
                "TABLES",
                "TO" | "FROM",
                "GROUP",
                group,
            ] => (
                &mut self.staged.default_grants,
                *verb == "GRANT",
                *privileges,
                *schema,
                *group,
            ),
            _ => return Err(format!("syntax error in '{statement}'")),
        };

        if !self.warehouse.schema_exists(schema) {
            return Err(format!("schema \"{schema}\" does not exist"));
        }
        if !self.warehouse.group_exists(group) {
            return Err(format!("group \"{group}\" does not exist"));
        }
        let privileges = privileges
            .split(',')
            .map(|name| {
                Privileges::from_name(name).ok_or_else(|| format!("unknown privilege {name}"))
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .fold(Privileges::empty(), |acc, p| acc | p);

        let entry = grants
            .entry((schema.to_string(), group.to_string()))
            .or_insert_with(Privileges::empty);
        if grant {
            entry.insert(privileges);
        } else {
            entry.remove(privileges);
        }
        Ok(())
    }

    fn default_acl(&self, schema: &str) -> String {
        let mut items = vec![OWNER_ACL.to_string()];
        for ((grant_schema, group), privileges) in &self.staged.default_grants {
            if grant_schema == schema && !privileges.is_empty() {
                let item = AclItem {
                    grantee: Grantee::Group(group.clone()),
                    privileges: *privileges,
                    grantor: Some(OWNER.to_string()),
                };
                items.push(item.to_string());
            }
        }
        if let Some(seeded) = self.warehouse.seeded_acls.get(schema) {
            items.extend(seeded.iter().cloned());
        }
        items.join(ACL_SEPARATOR.to_string().as_str())
    }
}

#[async_trait]
impl CatalogTransaction for FakeTransaction<'_> {
    async fn schema_name(&mut self, schema_id: u32) -> Result<Option<String>, ProviderError> {
        Ok(self.warehouse.schemas.get(&schema_id).cloned())
    }

    async fn group_name(&mut self, group_id: u32) -> Result<Option<String>, ProviderError> {
        Ok(self.warehouse.groups.get(&group_id).cloned())
    }

    async fn default_table_acls(
        &mut self,
        id: SchemaGroupId,
    ) -> Result<Vec<DefaultAclRow>, ProviderError> {
        if self.warehouse.hide_default_acls {
            return Ok(vec![]);
        }
        let (Some(schema), Some(group)) = (
            self.warehouse.schemas.get(&id.schema_id),
            self.warehouse.groups.get(&id.group_id),
        ) else {
            return Ok(vec![]);
        };
        Ok(vec![DefaultAclRow {
            group_name: group.clone(),
            acl: self.default_acl(schema),
        }])
    }

    async fn execute(&mut self, statement: &str) -> Result<(), ProviderError> {
        self.warehouse.statements.push(statement.to_string());
        let fail = |reason: String| ProviderError::Statement {
            statement: statement.to_string(),
            source: reason.into(),
        };
        if self
            .warehouse
            .failing
            .iter()
            .any(|pattern| statement.contains(pattern.as_str()))
        {
            return Err(fail("injected failure".to_string()));
        }
        self.apply(statement).map_err(fail)
    }

    async fn commit(self: Box<Self>) -> Result<(), ProviderError> {
        let FakeTransaction { warehouse, staged } = *self;
        warehouse.state = staged;
        warehouse.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ProviderError> {
        self.warehouse.rollbacks += 1;
        Ok(())
    }
}

/// Splits a statement on whitespace, reading `"..."` as one identifier with
/// `""` escapes.
fn tokenize(statement: &str) -> Result<Vec<String>, String> {
    let mut tokens = vec![];
    let mut chars = statement.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            loop {
                match chars.next() {
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                        token.push('"');
                    }
                    Some('"') => break,
                    Some(c) => token.push(c),
                    None => return Err(format!("unterminated identifier in '{statement}'")),
                }
            }
        } else {
            token.push(c);
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dropped_transaction_discards_changes() {
        let mut warehouse = FakeWarehouse::new()
            .with_schema(1, "s")
            .with_group(2, "g");
        {
            let mut txn = warehouse.begin().await.unwrap();
            txn.execute("GRANT SELECT ON ALL TABLES IN SCHEMA s TO GROUP g")
                .await
                .unwrap();
        }
        assert_eq!(warehouse.table_privileges("s", "g"), Privileges::empty());
        assert_eq!(warehouse.commits(), 0);
    }

    #[test]
    fn test_tokenize_quoted_identifiers() {
        let tokens =
            tokenize(r#"GRANT SELECT ON ALL TABLES IN SCHEMA "Sales Data" TO GROUP "bi""team""#)
                .unwrap();
        assert_eq!(tokens[7], "Sales Data");
        assert_eq!(tokens[10], "bi\"team");
        assert!(tokenize("GROUP \"open").is_err());
    }

    #[tokio::test]
    async fn test_rejects_unknown_objects() {
        let mut warehouse = FakeWarehouse::new().with_schema(1, "s");
        let mut txn = warehouse.begin().await.unwrap();
        let err = txn
            .execute("GRANT SELECT ON ALL TABLES IN SCHEMA s TO GROUP missing")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("group \"missing\" does not exist"));
    }
}
