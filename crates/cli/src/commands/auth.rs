//! Account commands.

use lm_store_storefront::StoreClient;

use super::CommandError;

/// Log in and attach the user to error reports.
pub async fn login(client: &StoreClient, username: &str, password: &str) -> Result<(), CommandError> {
    let credential = client.auth().login(username, password).await?;

    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: credential.username.clone(),
            ..Default::default()
        }));
    });

    tracing::info!(
        "Logged in as {} ({})",
        credential.username.as_deref().unwrap_or(username),
        credential.role
    );
    Ok(())
}

pub async fn register(client: &StoreClient, username: &str, password: &str) -> Result<(), CommandError> {
    let next = client.auth().register(username, password).await?;
    tracing::info!("{} Log in with `lm login -u {username}`.", next.message());
    Ok(())
}

pub fn logout(client: &StoreClient) -> Result<(), CommandError> {
    let next = client.auth().logout()?;
    sentry::configure_scope(|scope| scope.set_user(None));
    tracing::info!("{}", next.message());
    Ok(())
}

pub fn whoami(client: &StoreClient) -> Result<(), CommandError> {
    let credential = client.auth().current()?.ok_or(CommandError::NotLoggedIn)?;
    tracing::info!(
        "{} ({})",
        credential.username.as_deref().unwrap_or("unknown user"),
        credential.role
    );
    Ok(())
}
