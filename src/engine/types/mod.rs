mod movie;
mod result;

pub use movie::{Enrichment, Mode, Movie};
pub use result::SearchResult;
