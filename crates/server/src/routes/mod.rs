pub mod admin;
pub mod brew;
pub mod health;

use crate::error::PageError;

/// Router fallback for unknown paths.
pub async fn not_found() -> PageError {
    PageError::not_found("Page not found.")
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::AppState;
    use std::collections::HashMap;
    use std::sync::Arc;
    use teashelf_db::InventoryDb;

    pub fn state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.keep().join("test.db");
        AppState {
            db: Arc::new(InventoryDb::open_path(&path).unwrap()),
        }
    }

    pub fn form(pairs: &[(&str, &str)]) -> axum::Form<HashMap<String, String>> {
        axum::Form(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}
