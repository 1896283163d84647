use std::path::Path;

use crate::commands::common::{open_engine, resolve_note_content, split_note_content};
use crate::error::CliError;

pub async fn run_add(
    title: Option<&str>,
    content_parts: &[String],
    db_path: &Path,
    profile: Option<&str>,
) -> Result<(), CliError> {
    let (title, body) = match title.map(str::trim).filter(|title| !title.is_empty()) {
        Some(title) => {
            let body = content_parts.join(" ").trim().to_string();
            (title.to_string(), body)
        }
        None => split_note_content(&resolve_note_content(content_parts)?),
    };

    let engine = open_engine(db_path, profile).await?;
    let note = engine.create_note(&title, &body).await?;

    if note.is_synced() {
        println!("{}", note.id);
    } else {
        println!("{} (saved locally, will sync later)", note.id);
    }
    Ok(())
}
