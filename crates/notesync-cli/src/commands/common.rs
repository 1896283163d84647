use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use notesync_core::config::GatewayConfig;
use notesync_core::gateway::HttpGateway;
use notesync_core::services::LocalStore;
use notesync_core::sync::SyncEngine;
use notesync_core::{NoteId, NoteRecord};
use serde::Serialize;

use crate::auth::KeyringTokenStore;
use crate::config_profiles::CliProfilesConfig;
use crate::error::CliError;

/// Environment variable overriding the local database location.
pub const DB_PATH_ENV: &str = "NOTESYNC_DB_PATH";

pub type CliGateway = HttpGateway<KeyringTokenStore>;
pub type CliEngine = SyncEngine<CliGateway>;

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub preview: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
    pub creator_username: String,
    pub synced: bool,
}

/// Write the notes either as pretty JSON or as aligned text lines.
pub fn print_notes(notes: &[NoteRecord], as_json: bool) -> Result<(), CliError> {
    if as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_note_lines(notes) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn format_note_lines(notes: &[NoteRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let id = note.id.to_string();
            let preview = note.title_preview(40);
            let relative_time = format_relative_time(note.updated_at, now_ms);
            let marker = if note.is_synced() { ' ' } else { '*' };

            format!("{id:>12}{marker} {preview:<40}  {relative_time}")
        })
        .collect()
}

pub fn note_to_list_item(note: &NoteRecord) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();

    NoteListItem {
        id: note.id.get(),
        title: note.title.clone(),
        body: note.body.clone(),
        preview: note.title_preview(80),
        created_at: note.created_at,
        updated_at: note.updated_at,
        relative_time: format_relative_time(note.updated_at, now_ms),
        creator_username: note.creator_username.clone(),
        synced: note.is_synced(),
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

/// Note text from arguments, piped stdin, or the editor, in that order.
pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }

    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }

    if let Some(content) = capture_editor_input()? {
        return Ok(content);
    }

    Err(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split editor text into a title (first line) and body (the rest).
pub fn split_note_content(content: &str) -> (String, String) {
    let content = content.trim();
    let (title, body) = content.split_once('\n').unwrap_or((content, ""));
    (title.trim().to_string(), body.trim().to_string())
}

/// Inverse of [`split_note_content`].
pub fn render_note_for_editor(note: &NoteRecord) -> String {
    if note.body.is_empty() {
        format!("{}\n", note.title)
    } else {
        format!("{}\n\n{}\n", note.title, note.body)
    }
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySearchQuery)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn parse_note_id(id: &str) -> Result<NoteId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyNoteId);
    }
    trimmed
        .parse::<NoteId>()
        .map_err(|_| CliError::InvalidNoteId(trimmed.to_string()))
}

pub async fn find_note(store: &LocalStore, id: NoteId) -> Result<NoteRecord, CliError> {
    store
        .find_by_id(id)
        .await?
        .filter(|note| !note.is_deleted)
        .ok_or_else(|| notesync_core::Error::NotFound(id.to_string()).into())
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn capture_editor_input() -> Result<Option<String>, CliError> {
    capture_editor_input_with_initial("")
}

pub fn capture_editor_input_with_initial(
    initial_content: &str,
) -> Result<Option<String>, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_note_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let note_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(normalize_content(&note_content))
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    let status = match Command::new(editor).arg(file_path).status() {
        Ok(status) => status,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            // EDITOR may carry arguments, e.g. "code --wait"
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };
            Command::new(program).args(parts).arg(file_path).status()?
        }
        Err(err) => return Err(CliError::Io(err)),
    };

    if status.success() {
        Ok(())
    } else {
        Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )))
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_note_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("notesync-note-{}-{now}.md", std::process::id()))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os(DB_PATH_ENV).map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("notesync")
        .join("notesync.db")
}

pub async fn open_store(path: &Path) -> Result<LocalStore, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(LocalStore::open_path(path).await?)
}

/// Base URL from `NOTESYNC_API_URL`, falling back to the profile's setting.
pub fn resolve_gateway_config(
    config: &CliProfilesConfig,
    profile_name: &str,
) -> Result<GatewayConfig, CliError> {
    if let Some(from_env) = GatewayConfig::from_env()? {
        return Ok(from_env);
    }

    let base_url = config
        .profile(profile_name)
        .and_then(|profile| profile.api_base_url())
        .ok_or(CliError::ApiNotConfigured)?;
    Ok(GatewayConfig::new(base_url)?)
}

pub fn open_gateway(profile: Option<&str>) -> Result<CliGateway, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile);
    let gateway_config = resolve_gateway_config(&config, &profile_name)?;

    tracing::debug!(
        "Using note service {} for profile '{}'",
        gateway_config.base_url(),
        profile_name
    );
    Ok(HttpGateway::new(
        gateway_config,
        KeyringTokenStore::for_profile(&profile_name),
    )?)
}

pub async fn open_engine(db_path: &Path, profile: Option<&str>) -> Result<CliEngine, CliError> {
    let gateway = open_gateway(profile)?;
    let store = open_store(db_path).await?;
    Ok(SyncEngine::new(store, gateway))
}
