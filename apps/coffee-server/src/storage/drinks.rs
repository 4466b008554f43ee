// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded drink database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `drinks`: id → serialized [`Drink`] (JSON bytes)
//! - `drink_titles`: title → id (uniqueness index)
//! - `drink_meta`: key → value (`next_id`)

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use tracing::info;

use crate::models::{Drink, Ingredient};

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary table: id → serialized Drink (JSON bytes).
const DRINKS: TableDefinition<u64, &[u8]> = TableDefinition::new("drinks");

/// Index: title → id.
const TITLES: TableDefinition<&str, u64> = TableDefinition::new("drink_titles");

/// Counters.
const META: TableDefinition<&str, u64> = TableDefinition::new("drink_meta");

const NEXT_ID: &str = "next_id";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("drink {0} not found")]
    NotFound(u64),

    #[error("a drink titled '{0}' already exists")]
    DuplicateTitle(String),

    #[error("invalid drink: {0}")]
    InvalidDrink(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

fn validate_title(title: &str) -> StoreResult<()> {
    if title.trim().is_empty() {
        return Err(StoreError::InvalidDrink("title must not be empty"));
    }
    Ok(())
}

fn validate_recipe(recipe: &[Ingredient]) -> StoreResult<()> {
    if recipe.is_empty() {
        return Err(StoreError::InvalidDrink("recipe must not be empty"));
    }
    if recipe
        .iter()
        .any(|i| i.name.trim().is_empty() || i.color.trim().is_empty())
    {
        return Err(StoreError::InvalidDrink(
            "ingredient name and color must not be empty",
        ));
    }
    Ok(())
}

// =============================================================================
// DrinkDatabase
// =============================================================================

/// Embedded ACID drink store.
///
/// Every method blocks on disk I/O. Async callers go through
/// [`DrinkDatabase::blocking`].
pub struct DrinkDatabase {
    db: Database,
}

impl DrinkDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DRINKS)?;
            let _ = write_txn.open_table(TITLES)?;
            let _ = write_txn.open_table(META)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Run `op` on the blocking thread pool.
    pub async fn blocking<T, F>(self: &Arc<Self>, op: F) -> StoreResult<T>
    where
        F: FnOnce(&DrinkDatabase) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(self);
        tokio::task::spawn_blocking(move || op(&db)).await?
    }

    /// All drinks in id order.
    pub fn list(&self) -> StoreResult<Vec<Drink>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRINKS)?;

        let mut drinks = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            drinks.push(serde_json::from_slice(value.value())?);
        }
        Ok(drinks)
    }

    pub fn get(&self, id: u64) -> StoreResult<Option<Drink>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DRINKS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Insert a new drink, assigning the next id.
    ///
    /// Fails with `DuplicateTitle` if the title is taken.
    pub fn insert(&self, title: &str, recipe: Vec<Ingredient>) -> StoreResult<Drink> {
        validate_title(title)?;
        validate_recipe(&recipe)?;

        let write_txn = self.db.begin_write()?;
        let drink = insert_in(&write_txn, title, recipe)?;
        write_txn.commit()?;

        info!(drink_id = drink.id, title = %drink.title, "Drink created");
        Ok(drink)
    }

    /// Replace the title and/or recipe of an existing drink.
    pub fn update(
        &self,
        id: u64,
        title: Option<&str>,
        recipe: Option<Vec<Ingredient>>,
    ) -> StoreResult<Drink> {
        if let Some(title) = title {
            validate_title(title)?;
        }
        if let Some(recipe) = &recipe {
            validate_recipe(recipe)?;
        }

        let write_txn = self.db.begin_write()?;
        let drink = {
            let mut drinks = write_txn.open_table(DRINKS)?;
            let mut drink: Drink = match drinks.get(id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StoreError::NotFound(id)),
            };

            if let Some(title) = title {
                if title != drink.title {
                    let mut titles = write_txn.open_table(TITLES)?;
                    if titles.get(title)?.is_some() {
                        return Err(StoreError::DuplicateTitle(title.to_string()));
                    }
                    titles.remove(drink.title.as_str())?;
                    titles.insert(title, id)?;
                    drink.title = title.to_string();
                }
            }
            if let Some(recipe) = recipe {
                drink.recipe = recipe;
            }

            let json = serde_json::to_vec(&drink)?;
            drinks.insert(id, json.as_slice())?;
            drink
        };
        write_txn.commit()?;

        info!(drink_id = id, "Drink updated");
        Ok(drink)
    }

    pub fn delete(&self, id: u64) -> StoreResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut drinks = write_txn.open_table(DRINKS)?;
            let drink: Drink = match drinks.remove(id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(StoreError::NotFound(id)),
            };
            write_txn
                .open_table(TITLES)?
                .remove(drink.title.as_str())?;
        }
        write_txn.commit()?;

        info!(drink_id = id, "Drink deleted");
        Ok(())
    }

    /// Drop every drink and seed the menu with water, in one transaction.
    pub fn reset(&self) -> StoreResult<Drink> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(DRINKS)?;
        write_txn.delete_table(TITLES)?;
        write_txn.delete_table(META)?;
        let water = insert_in(
            &write_txn,
            "water",
            vec![Ingredient {
                name: "water".to_string(),
                color: "blue".to_string(),
                parts: 1,
            }],
        )?;
        write_txn.commit()?;

        info!(drink_id = water.id, "Drink database reset");
        Ok(water)
    }
}

/// Insert inside an open write transaction. Opens (and so creates) all tables.
fn insert_in(
    write_txn: &WriteTransaction,
    title: &str,
    recipe: Vec<Ingredient>,
) -> StoreResult<Drink> {
    let mut titles = write_txn.open_table(TITLES)?;
    if titles.get(title)?.is_some() {
        return Err(StoreError::DuplicateTitle(title.to_string()));
    }

    let mut meta = write_txn.open_table(META)?;
    let id = meta.get(NEXT_ID)?.map(|v| v.value()).unwrap_or(1);
    meta.insert(NEXT_ID, id + 1)?;

    let drink = Drink {
        id,
        title: title.to_string(),
        recipe,
    };
    let json = serde_json::to_vec(&drink)?;
    write_txn.open_table(DRINKS)?.insert(id, json.as_slice())?;
    titles.insert(title, id)?;
    Ok(drink)
}
