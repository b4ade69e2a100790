use super::Movie;
use crate::engine::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// The records of one search or listing, with a description of the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchResult {
    pub query: String,
    pub movies: Vec<Movie>,
}

impl SearchResult {
    pub fn new(query: impl Into<String>, movies: Vec<Movie>) -> Self {
        Self {
            query: query.into(),
            movies,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.movies.len()
    }

    /// Titles of all records, in batch order
    pub fn titles(&self) -> Vec<&str> {
        self.movies.iter().map(|m| m.title.as_str()).collect()
    }

    /// Find a record by exact title.
    ///
    /// Titles are not guaranteed unique within a batch; the first record in
    /// batch order (lowest `index`) wins.
    pub fn get_by_title(&self, title: &str) -> Result<&Movie> {
        self.index_of_title(title).map(|i| &self.movies[i])
    }

    /// Position of the first record with the given title
    pub fn index_of_title(&self, title: &str) -> Result<usize> {
        self.movies
            .iter()
            .position(|m| m.title == title)
            .ok_or_else(|| EngineError::NotFound(format!("Movie not found: {title}")))
    }
}
