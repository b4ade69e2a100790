use crate::engine::types::Movie;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Ties a detail-page response back to the record it was fetched for.
///
/// The ordinal assigned while parsing the primary page. It travels with every
/// detail request, including nested ones, so handlers never have to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationKey(pub usize);

impl std::fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// In-progress records of one scrape run, shared by the primary and detail
/// crawls.
///
/// Every mutation goes through the lock. `update` is the read-modify-write
/// primitive; `lock` is for callers composing several operations.
#[derive(Debug, Default)]
pub struct ResultTable {
    movies: Mutex<HashMap<CorrelationKey, Movie>>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record for `key`
    pub fn put(&self, key: CorrelationKey, movie: Movie) {
        self.movies.lock().insert(key, movie);
    }

    /// Copy of the record for `key`
    pub fn get(&self, key: CorrelationKey) -> Option<Movie> {
        self.movies.lock().get(&key).cloned()
    }

    /// Mutate the record for `key` in place. Returns false if there is none.
    pub fn update<F>(&self, key: CorrelationKey, f: F) -> bool
    where
        F: FnOnce(&mut Movie),
    {
        let mut movies = self.movies.lock();
        match movies.get_mut(&key) {
            Some(movie) => {
                f(movie);
                true
            }
            None => false,
        }
    }

    /// Hold the lock across several operations
    pub fn lock(&self) -> MutexGuard<'_, HashMap<CorrelationKey, Movie>> {
        self.movies.lock()
    }

    pub fn len(&self) -> usize {
        self.movies.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.lock().is_empty()
    }

    /// Point-in-time snapshot, in no particular order
    pub fn values(&self) -> Vec<Movie> {
        self.movies.lock().values().cloned().collect()
    }

    /// Consume the table into records sorted by `index`
    pub fn into_sorted(self) -> Vec<Movie> {
        let mut movies: Vec<Movie> = self.movies.into_inner().into_values().collect();
        movies.sort_by_key(|m| m.index);
        movies
    }
}
