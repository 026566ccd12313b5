//! Index location helpers.

use std::path::{Path, PathBuf};

/// File name of the SQLite database inside an index directory.
pub const INDEX_FILE_NAME: &str = "index.sqlite";

/// Get the SQLite index path for an index directory.
pub fn get_index_path(index_dir: &Path) -> PathBuf {
    index_dir.join(INDEX_FILE_NAME)
}

/// Whether an index directory holds a database.
pub fn index_exists(index_dir: &Path) -> bool {
    get_index_path(index_dir).is_file()
}
