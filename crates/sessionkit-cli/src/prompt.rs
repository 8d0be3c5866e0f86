//! Terminal prompts for the sign-in form.

use std::io::{self, Write};

use anyhow::Result;

/// Prompt for an email, offering `default` when Enter is pressed.
pub fn prompt_email(default: Option<&str>) -> Result<String> {
    match default.filter(|d| !d.is_empty()) {
        Some(default) => print!("Email [{}]: ", default),
        None => print!("Email: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    Ok(match default {
        Some(default) if input.is_empty() => default.to_string(),
        _ => input.to_string(),
    })
}

pub fn prompt_password() -> Result<String> {
    let password = rpassword::prompt_password("Password: ")?;
    Ok(password)
}

pub fn prompt_remember() -> Result<bool> {
    print!("Remember this device? [y/N]: ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(parse_yes(&input))
}

/// One-line notice for a session that lives in memory only.
pub fn session_notice(remember: bool) -> Option<&'static str> {
    if remember {
        None
    } else {
        Some("This session is not remembered and ends when sessionkit exits.")
    }
}

fn parse_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
