use std::env;

use notesync_core::config::{GatewayConfig, API_URL_ENV};

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            no_activate,
        } => {
            let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
            let profile_name = init_profile(
                &mut config,
                profile.as_deref(),
                api_base_url,
                no_activate,
            )?;
            let path = config.save().map_err(CliError::Config)?;
            println!(
                "Profile '{}' initialized at {}",
                profile_name,
                path.display()
            );

            let ready = config
                .profile(&profile_name)
                .and_then(|profile| profile.api_base_url())
                .is_some();
            if ready {
                println!(
                    "Run `notesync auth login --username <name> --password <password>` to sign in."
                );
            } else {
                println!("Profile '{profile_name}' is missing: api_base_url");
            }
            Ok(())
        }
    }
}

/// Merge the explicit URL, then `NOTESYNC_API_URL`, then the stored value into
/// the named profile. Returns the resolved profile name.
pub fn init_profile(
    config: &mut CliProfilesConfig,
    profile: Option<&str>,
    explicit_api_base_url: Option<String>,
    no_activate: bool,
) -> Result<String, CliError> {
    let profile_name = config.resolve_profile_name(profile);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged_api_base_url = normalize_text_option(explicit_api_base_url)
        .or_else(|| normalize_text_option(env::var(API_URL_ENV).ok()))
        .or_else(|| existing.api_base_url());

    if let Some(url) = merged_api_base_url {
        let validated = GatewayConfig::new(&url)
            .map_err(|error| CliError::Config(format!("api_base_url is not usable: {error}")))?;
        config.profile_mut_or_default(&profile_name).api_base_url =
            Some(validated.base_url().to_string());
    } else {
        config.profile_mut_or_default(&profile_name);
    }

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    Ok(profile_name)
}
