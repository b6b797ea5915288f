use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use crate::Result;

/// Per detector memoized values
///
/// A value is computed the first time a detector is queried and is never invalidated;
/// when two threads race to fill the same entry, the first value inserted is kept.
pub(crate) struct Memo<T> {
    label: &'static str,
    entries: RwLock<HashMap<String, T>>,
}
impl<T: Clone> Memo<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            entries: RwLock::new(HashMap::new()),
        }
    }
    /// Returns the value of `key`, computing it with `f` if it is not in the cache yet
    pub fn get_or_try_insert<F>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(value.clone());
        }
        let value = f()?;
        log::debug!("caching the {} of {}", self.label, key);
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.entry(key.to_owned()).or_insert(value).clone())
    }
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
