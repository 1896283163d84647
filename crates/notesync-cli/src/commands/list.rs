use std::path::Path;

use crate::commands::common::{open_store, print_notes};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let store = open_store(db_path).await?;
    let mut notes = store.query(None).await?;
    notes.truncate(limit);

    print_notes(&notes, as_json)
}
