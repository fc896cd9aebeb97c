//! One handler per CLI command.

use std::io::{self, Write};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use userdesk_core::auth::{SessionError, UpdateOutcome};
use userdesk_core::models::{Profile, ProfileUpdate};
use userdesk_core::Config;

use crate::Session;

/// Environment variable consulted before prompting for a password
const PASSWORD_ENV: &str = "USERDESK_PASSWORD";

pub async fn login(session: &Session, config: &mut Config, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt_email(config.last_email.as_deref())?,
    };
    let password = read_password(PasswordPrompt::SignIn)?;

    println!("Authenticating...");
    let profile = session.login(&email, &password).await?;
    remember_email(config, &profile)?;

    println!("Signed in as {} <{}>", profile.name, profile.email);
    Ok(())
}

pub async fn register(
    session: &Session,
    config: &mut Config,
    name: &str,
    email: Option<String>,
) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt_email(None)?,
    };
    let password = read_password(PasswordPrompt::SignIn)?;

    let profile = session.register(name, &email, &password).await?;
    remember_email(config, &profile)?;

    println!("Account created. Signed in as {} <{}>", profile.name, profile.email);
    Ok(())
}

pub fn logout(session: &Session) -> Result<()> {
    let was_signed_in = session.snapshot().credential().is_some();
    session.logout();
    if was_signed_in {
        println!("Signed out.");
    } else {
        println!("Not signed in.");
    }
    Ok(())
}

pub fn status(session: &Session) -> Result<()> {
    let state = session.snapshot();
    println!("Status: {}", state.phase().label());
    if let Some(profile) = state.profile() {
        println!("User:   {} <{}> (id {})", profile.name, profile.email, profile.id);
    }
    Ok(())
}

pub async fn profile(session: &Session) -> Result<()> {
    session.gate().require().await?;
    let state = session.snapshot();
    let profile = state.profile().ok_or(SessionError::NotSignedIn)?;
    print_profile(profile);
    Ok(())
}

pub async fn update(
    session: &Session,
    name: Option<String>,
    email: Option<String>,
    change_password: bool,
) -> Result<()> {
    session.gate().require().await?;

    let password = if change_password {
        Some(read_password(PasswordPrompt::NewPassword)?)
    } else {
        None
    };
    let update = ProfileUpdate {
        name,
        email,
        password,
    };

    let outcome = session.update_profile(&update).await?;
    println!("{}", outcome.message());
    if outcome == UpdateOutcome::Updated {
        if let Some(profile) = session.snapshot().profile() {
            print_profile(profile);
        }
    }
    Ok(())
}

pub async fn users(session: &Session) -> Result<()> {
    session.gate().require().await?;
    let own_id = session.snapshot().profile().map(|profile| profile.id);

    let users = session.list_users().await?;
    if users.is_empty() {
        println!("No users.");
        return Ok(());
    }

    println!("{:>6}  {:<24}  {:<32}  {}", "ID", "NAME", "EMAIL", "CREATED");
    for user in &users {
        println!("{}", user_row(user, own_id == Some(user.id)));
    }
    Ok(())
}

pub async fn user(session: &Session, id: i64) -> Result<()> {
    session.gate().require().await?;
    let user = session.fetch_user(id).await?;
    print_profile(&user);
    Ok(())
}

pub async fn delete_user(session: &Session, id: i64) -> Result<()> {
    session.gate().require().await?;
    session.delete_user(id).await?;

    println!("Deleted user {}.", id);
    if session.snapshot().credential().is_none() {
        println!("That was your own account; you have been signed out.");
    }
    Ok(())
}

// ===== Helpers =====

fn remember_email(config: &mut Config, profile: &Profile) -> Result<()> {
    config.last_email = Some(profile.email.clone());
    config.save().context("Failed to save config")
}

fn print_profile(profile: &Profile) {
    println!("ID:      {}", profile.id);
    println!("Name:    {}", profile.name);
    println!("Email:   {}", profile.email);
    println!("Created: {}", format_timestamp(&profile.created_at));
    println!("Updated: {}", format_timestamp(&profile.updated_at));
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn user_row(user: &Profile, is_self: bool) -> String {
    let marker = if is_self { " (you)" } else { "" };
    format!(
        "{:>6}  {:<24}  {:<32}  {}{}",
        user.id,
        user.name,
        user.email,
        user.created_at.format("%Y-%m-%d"),
        marker
    )
}

fn prompt_email(last_email: Option<&str>) -> Result<String> {
    match last_email {
        Some(last) => print!("Email [{}]: ", last),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(choose_email(&input, last_email))
}

/// Blank input falls back to the remembered email.
fn choose_email(input: &str, last_email: Option<&str>) -> String {
    let input = input.trim();
    match last_email {
        Some(last) if input.is_empty() => last.to_string(),
        _ => input.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PasswordPrompt {
    SignIn,
    NewPassword,
}

impl PasswordPrompt {
    fn label(&self) -> &'static str {
        match self {
            PasswordPrompt::SignIn => "Password: ",
            PasswordPrompt::NewPassword => "New password: ",
        }
    }

    /// `USERDESK_PASSWORD` only ever answers the sign-in prompt.
    fn env_answer(&self, value: Option<String>) -> Option<String> {
        match self {
            PasswordPrompt::SignIn => value,
            PasswordPrompt::NewPassword => None,
        }
    }
}

fn read_password(prompt: PasswordPrompt) -> Result<String> {
    if let Some(password) = prompt.env_answer(std::env::var(PASSWORD_ENV).ok()) {
        return Ok(password);
    }
    rpassword::prompt_password(prompt.label()).context("Failed to read password")
}
