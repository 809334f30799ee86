use clap::Subcommand;

use streamtimer_core::integrations::twitch;

use crate::common::{block_on, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Run the Twitch OAuth flow and store tokens for a tenant
    Login {
        tenant: String,
        /// Twitch application client id (or TWITCH_CLIENT_ID)
        #[arg(long)]
        client_id: Option<String>,
        /// Twitch application client secret (or TWITCH_CLIENT_SECRET)
        #[arg(long)]
        client_secret: Option<String>,
    },
    /// Validate the stored token and show who it belongs to
    Status { tenant: String },
    /// Forget the stored tokens
    Logout { tenant: String },
}

fn credential(flag: Option<String>, env_var: &str) -> Result<String, Box<dyn std::error::Error>> {
    flag.or_else(|| std::env::var(env_var).ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing Twitch credential: pass a flag or set {env_var}").into())
}

pub fn run(action: AuthAction) -> CliResult {
    match action {
        AuthAction::Login {
            tenant,
            client_id,
            client_secret,
        } => {
            let auth = twitch::TwitchAuth::new(
                credential(client_id, "TWITCH_CLIENT_ID")?,
                credential(client_secret, "TWITCH_CLIENT_SECRET")?,
            );
            let identity = block_on(async {
                let tokens = auth.authorize(&tenant).await?;
                twitch::validate(&tokens.access_token).await
            })??;
            println!(
                "Authenticated {tenant} as {} (user id {})",
                identity.login, identity.user_id
            );
            Ok(())
        }
        AuthAction::Status { tenant } => {
            let Some(tokens) = twitch::load_tokens(&tenant)? else {
                println!("{tenant}: not authenticated");
                return Ok(());
            };
            match block_on(twitch::validate(&tokens.access_token))? {
                Ok(identity) => println!(
                    "{tenant}: authenticated as {} (expires in {}s)",
                    identity.login, identity.expires_in
                ),
                Err(e) => println!("{tenant}: stored token is no longer valid ({e})"),
            }
            Ok(())
        }
        AuthAction::Logout { tenant } => {
            twitch::clear_tokens(&tenant)?;
            println!("Removed stored Twitch tokens for {tenant}");
            Ok(())
        }
    }
}
