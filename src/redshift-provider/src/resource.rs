// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The lifecycle contract between a provider host and a resource.
//!
//! A host correlates declared configuration with live state through an
//! identity it persists between runs. For each resource it calls
//! [`Resource::exists`] before [`Resource::read`], and otherwise one of
//! create, update, delete or import depending on the plan.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;

use crate::catalog::Warehouse;
use crate::error::ProviderError;

/// The type of a declared attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    Int,
    Bool,
}

/// One declared attribute of a resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Changing the attribute replaces the resource instead of updating it.
    pub force_new: bool,
}

impl Attribute {
    pub fn required_int(name: &'static str) -> Self {
        Attribute {
            name,
            kind: AttributeKind::Int,
            required: true,
            default: None,
            force_new: false,
        }
    }

    pub fn optional_bool(name: &'static str, default: bool) -> Self {
        Attribute {
            name,
            kind: AttributeKind::Bool,
            required: false,
            default: Some(serde_json::Value::Bool(default)),
            force_new: false,
        }
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }
}

/// The declared configuration schema of a resource type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub attributes: Vec<Attribute>,
}

/// A resource adopted by [`Resource::import`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedResource<I, S> {
    pub id: I,
    pub state: S,
}

/// Lifecycle operations of a managed resource.
///
/// Every operation runs in its own transaction on `warehouse` and commits
/// only when it succeeds.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The persisted identity.
    type Id: fmt::Display + FromStr + Copy + Send + Sync;
    /// The declared (and refreshed) state.
    type State: Send + Sync;

    fn schema(&self) -> ResourceSchema;

    /// Reports whether the resource still exists. Absence is not an error.
    async fn exists(
        &self,
        warehouse: &mut dyn Warehouse,
        id: Self::Id,
    ) -> Result<bool, ProviderError>;

    /// Creates the resource and returns its identity with the state read
    /// back after the write.
    async fn create(
        &self,
        warehouse: &mut dyn Warehouse,
        desired: &Self::State,
    ) -> Result<(Self::Id, Self::State), ProviderError>;

    /// Refreshes the state, or returns `None` if the resource is gone.
    async fn read(
        &self,
        warehouse: &mut dyn Warehouse,
        id: Self::Id,
    ) -> Result<Option<Self::State>, ProviderError>;

    /// Converges the resource to `desired` in place.
    async fn update(
        &self,
        warehouse: &mut dyn Warehouse,
        id: Self::Id,
        desired: &Self::State,
    ) -> Result<Self::State, ProviderError>;

    async fn delete(&self, warehouse: &mut dyn Warehouse, id: Self::Id)
    -> Result<(), ProviderError>;

    /// Adopts an existing resource identified by `id`.
    async fn import(
        &self,
        warehouse: &mut dyn Warehouse,
        id: Self::Id,
    ) -> Result<Vec<ImportedResource<Self::Id, Self::State>>, ProviderError>;
}
