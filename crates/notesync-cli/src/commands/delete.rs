use std::path::Path;

use crate::commands::common::{find_note, open_engine, parse_note_id};
use crate::error::CliError;

pub async fn run_delete(id: &str, db_path: &Path, profile: Option<&str>) -> Result<(), CliError> {
    let note_id = parse_note_id(id)?;
    let engine = open_engine(db_path, profile).await?;
    let note = find_note(engine.store(), note_id).await?;

    engine.delete_note(&note).await?;
    println!("{}", note.id);
    Ok(())
}
