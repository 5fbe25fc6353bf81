use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DomainError, DomainResult};
use crate::logic::query_params::{by_id, EagerLoad, QueryParams, Relation};
use crate::model::Id;
use crate::store::traits::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one row; none is a not-found error
    One,
    Many,
}

/// Executes composed queries and shapes their rows
pub struct RecordAccessor<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> RecordAccessor<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn fetch(
        &self,
        params: QueryParams,
        cardinality: Cardinality,
    ) -> DomainResult<Vec<Value>> {
        let entity = params.root().table.entity_name();
        log::debug!("fetch {} ({:?})", entity, cardinality);

        let mut rows = self.store.query_records(&params).await?;
        match cardinality {
            Cardinality::One if rows.is_empty() => Err(DomainError::NotFound { entity }),
            Cardinality::One => {
                rows.truncate(1);
                Ok(rows)
            }
            Cardinality::Many => Ok(rows),
        }
    }

    pub async fn fetch_one<T: DeserializeOwned>(&self, params: QueryParams) -> DomainResult<T> {
        let entity = params.root().table.entity_name();
        let row = self
            .fetch(params, Cardinality::One)
            .await?
            .into_iter()
            .next()
            .ok_or(DomainError::NotFound { entity })?;
        decode(entity, row)
    }

    pub async fn fetch_all<T: DeserializeOwned>(
        &self,
        params: QueryParams,
    ) -> DomainResult<Vec<T>> {
        let entity = params.root().table.entity_name();
        self.fetch(params, Cardinality::Many)
            .await?
            .into_iter()
            .map(|row| decode(entity, row))
            .collect()
    }

    /// Single record by primary key with the given relations loaded
    pub async fn fetch_by_id<T: DeserializeOwned>(
        &self,
        root: Relation,
        id: Id,
        extra_loads: &[EagerLoad],
    ) -> DomainResult<T> {
        let params = by_id(root, id).eager_all(extra_loads.iter().copied());
        self.fetch_one(params).await
    }
}

fn decode<T: DeserializeOwned>(entity: &str, row: Value) -> DomainResult<T> {
    let value = serde_json::from_value(row)
        .with_context(|| format!("Failed to decode {} record", entity))?;
    Ok(value)
}
