use crate::db::Database;
use tempfile::NamedTempFile;

mod completions;
mod subscriptions;

/// Helper: create a fresh database with migrations applied
pub(super) async fn setup_db() -> (Database, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();
    (db, temp_file)
}
