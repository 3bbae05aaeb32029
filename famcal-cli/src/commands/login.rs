use anyhow::Result;
use dialoguer::Input;
use famcal_core::config::AppConfig;
use famcal_core::remote::session::{AuthSession, LoginForm};
use owo_colors::OwoColorize;

use crate::utils::tui::create_spinner;

pub async fn run(email: Option<String>) -> Result<()> {
    let config = AppConfig::load()?;

    let Some(backend) = config.backend.as_ref() else {
        anyhow::bail!(
            "No backend configured, famcal is running in local-only mode.\n\n\
            Add a [backend] section to:\n  {}",
            AppConfig::config_path()?.display()
        );
    };

    let mut form = LoginForm {
        email: match email {
            Some(email) => email,
            None => Input::new().with_prompt("  Email").interact_text()?,
        },
        ..Default::default()
    };
    form.password = rpassword::prompt_password("  Password: ")?;

    let spinner = create_spinner("Signing in...".to_string());
    let session = form.submit(backend, &config.session_path()).await;
    spinner.finish_and_clear();

    match session {
        Some(session) => {
            println!("{}", format!("  Signed in as {}", session.email()).green());
            Ok(())
        }
        None => {
            let message = form.error.unwrap_or_default();
            anyhow::bail!("{}", message)
        }
    }
}

pub fn logout() -> Result<()> {
    let config = AppConfig::load()?;
    AuthSession::clear(&config.session_path())?;
    println!("  Signed out.");
    Ok(())
}
