use std::path::Path;

use notesync_core::gateway::RemoteGateway;
use notesync_core::sync::SyncEngine;

use crate::commands::common::open_engine;
use crate::error::CliError;

pub async fn run_sync(pages: u32, db_path: &Path, profile: Option<&str>) -> Result<(), CliError> {
    let mut engine = open_engine(db_path, profile).await?;
    if !engine.gateway().is_logged_in()? {
        return Err(CliError::NotLoggedIn);
    }

    let fetched = sync_pages(&mut engine, pages).await?;
    let pending = engine.store().find_unsynced().await?.len();
    let visible = engine.view().await?.len();

    println!("Sync completed: {fetched} page(s) pulled, {visible} notes stored");
    if pending > 0 {
        println!("{pending} local change(s) could not be pushed and will be retried");
    }
    Ok(())
}

/// Refresh, then page forward until `pages` pages are stored or the server
/// runs out. Returns the number of pages pulled.
pub async fn sync_pages<G: RemoteGateway>(
    engine: &mut SyncEngine<G>,
    pages: u32,
) -> Result<u32, CliError> {
    let mut view = engine.refresh().await?;
    let mut fetched = 1;

    while fetched < pages {
        let Some(last) = view.last().cloned() else {
            break;
        };
        if !engine.load_more(&last).await? {
            break;
        }
        fetched += 1;
        view = engine.view().await?;
    }

    Ok(fetched)
}
