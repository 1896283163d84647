use std::path::Path;

use crate::commands::common::{
    capture_editor_input_with_initial, find_note, open_engine, parse_note_id,
    render_note_for_editor, split_note_content,
};
use crate::error::CliError;

pub async fn run_edit(id: &str, db_path: &Path, profile: Option<&str>) -> Result<(), CliError> {
    let note_id = parse_note_id(id)?;
    let engine = open_engine(db_path, profile).await?;
    let note = find_note(engine.store(), note_id).await?;

    let Some(edited_content) = capture_editor_input_with_initial(&render_note_for_editor(&note))?
    else {
        return Err(CliError::EmptyEditedContent);
    };

    let (title, body) = split_note_content(&edited_content);
    if title == note.title && body == note.body {
        println!("{}", note.id);
        return Ok(());
    }

    let updated = engine.update_note(&note, &title, &body).await?;
    println!("{}", updated.id);
    Ok(())
}
