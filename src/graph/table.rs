use std::collections::HashMap;

use crate::error::{Result, ReviewgraphError};
use crate::model::Entity;

/// Id-keyed rows of one entity type, iterated in insertion order.
#[derive(Debug, Clone)]
pub(crate) struct Table<T> {
    rows: HashMap<i64, T>,
    order: Vec<i64>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Entity> Table<T> {
    pub fn insert(&mut self, row: T) -> Result<()> {
        let id = row.id();
        if self.rows.contains_key(&id) {
            return Err(ReviewgraphError::InvalidInput(format!(
                "{} with id {} already exists",
                T::KIND,
                id
            )));
        }
        self.rows.insert(id, row);
        self.order.push(id);
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<&T> {
        self.rows.get(&id).ok_or(ReviewgraphError::NotFound {
            entity: T::KIND.name(),
            id,
        })
    }

    pub fn get_mut(&mut self, id: i64) -> Result<&mut T> {
        self.rows.get_mut(&id).ok_or(ReviewgraphError::NotFound {
            entity: T::KIND.name(),
            id,
        })
    }

    pub fn contains(&self, id: i64) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn remove(&mut self, id: i64) -> Result<T> {
        let row = self.rows.remove(&id).ok_or(ReviewgraphError::NotFound {
            entity: T::KIND.name(),
            id,
        })?;
        self.order.retain(|&existing| existing != id);
        Ok(row)
    }

    /// Highest live id + 1, like a SQLite rowid without AUTOINCREMENT:
    /// removing the highest row frees its id for reuse.
    pub fn next_id(&self) -> Result<i64> {
        let max = self.order.iter().copied().max().unwrap_or(0);
        max.checked_add(1).ok_or_else(|| {
            ReviewgraphError::InvalidInput(format!("{} id space exhausted at {}", T::KIND, max))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().filter_map(move |id| self.rows.get(id))
    }
}
