//! Account commands.
//!
//! # Usage
//!
//! ```bash
//! # Create an account, then log in
//! qkart register -u shopper -p s3cret-pw
//! qkart login -u shopper -p s3cret-pw
//!
//! # Who is logged in and which actions are available
//! qkart whoami
//!
//! # Forget the stored session
//! qkart logout
//! ```

use std::io::{self, Write};

use secrecy::SecretString;

use qkart_storefront::Storefront;

use crate::error::Result;
use crate::render;

pub async fn login(storefront: &Storefront, username: &str, password: String) -> Result<()> {
    let password = SecretString::from(password);
    let session = storefront.auth().login(username, &password).await?;

    let mut out = io::stdout().lock();
    writeln!(out, "Logged in successfully")?;
    render::navigation(&mut out, &storefront.navigation(false))?;
    tracing::debug!(?session, "Session stored");
    Ok(())
}

pub async fn register(
    storefront: &Storefront,
    username: &str,
    password: String,
    confirm: Option<String>,
) -> Result<()> {
    let confirm = SecretString::from(confirm.unwrap_or_else(|| password.clone()));
    let password = SecretString::from(password);
    let username = storefront
        .auth()
        .register(username, &password, &confirm)
        .await?;

    writeln!(
        io::stdout().lock(),
        "Registered successfully as {username}. Run `qkart login` to continue."
    )?;
    Ok(())
}

pub fn logout(storefront: &Storefront) -> Result<()> {
    storefront.logout()?;
    let mut out = io::stdout().lock();
    writeln!(out, "Logged out")?;
    render::navigation(&mut out, &storefront.navigation(false))?;
    Ok(())
}

pub fn whoami(storefront: &Storefront) -> Result<()> {
    let mut out = io::stdout().lock();
    render::navigation(&mut out, &storefront.navigation(false))?;
    if let Some(balance) = storefront.gate().stored().and_then(|s| s.balance) {
        writeln!(out, "Wallet balance: {balance}")?;
    }
    Ok(())
}
