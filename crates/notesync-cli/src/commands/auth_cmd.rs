use notesync_core::auth::Registration;
use notesync_core::gateway::GatewayError;

use crate::cli::AuthCommands;
use crate::commands::common::open_gateway;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, profile: Option<&str>) -> Result<(), CliError> {
    let gateway = open_gateway(profile)?;

    match command {
        AuthCommands::Register {
            username,
            email,
            first_name,
            last_name,
            password,
            password_confirmation,
        } => {
            let registration = Registration {
                username,
                password,
                password_confirmation,
                first_name,
                last_name,
                email,
            };
            gateway.register(&registration).await?;
            println!(
                "Registered '{}'. Run `notesync auth login` to sign in.",
                registration.username.trim()
            );
        }
        AuthCommands::Login { username, password } => {
            gateway.login(&username, &password).await?;
            println!("Signed in as {}", username.trim());
        }
        AuthCommands::Status => {
            if !gateway.is_logged_in()? {
                println!("Not signed in.");
                return Ok(());
            }
            match gateway.user_info().await {
                Ok(user) => println!(
                    "Signed in as {} ({}) on {}",
                    user.display_name(),
                    user.username,
                    gateway.config().base_url()
                ),
                Err(GatewayError::Unauthorized) => {
                    println!("Stored session has expired. Run `notesync auth login` again.");
                }
                Err(error) => return Err(error.into()),
            }
        }
        AuthCommands::Logout => {
            gateway.logout()?;
            println!("Signed out");
        }
        AuthCommands::ChangePassword {
            old_password,
            new_password,
            confirmation,
        } => {
            if !gateway.is_logged_in()? {
                return Err(CliError::NotLoggedIn);
            }
            gateway
                .change_password(&old_password, &new_password, &confirmation)
                .await?;
            println!("Password changed");
        }
    }

    Ok(())
}
