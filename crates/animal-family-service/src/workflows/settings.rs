//! Site settings workflows.

use animal_family_core::{Action, AdBanner, ChatLink, Result, SiteSettings};
use animal_family_store::Store;

use crate::auth::Caller;

/// Banner and chat link, readable by anyone.
pub async fn current(store: &dyn Store) -> Result<SiteSettings> {
    Ok(store.get_settings().await?)
}

/// Replace the banner (admin only).
pub async fn set_banner(
    store: &dyn Store,
    caller: &Caller,
    title: &str,
    body: &str,
) -> Result<AdBanner> {
    caller.authorize(Action::AdminSurface)?;
    let banner = AdBanner::new(title, body)?;
    store.put_banner(&banner).await?;
    tracing::info!(admin = ?caller.entitlements.account_id, "Banner updated");
    Ok(banner)
}

/// Replace the community chat link (admin only).
pub async fn set_chat_link(store: &dyn Store, caller: &Caller, url: &str) -> Result<ChatLink> {
    caller.authorize(Action::AdminSurface)?;
    let link = ChatLink::new(url)?;
    store.put_chat_link(&link).await?;
    tracing::info!(admin = ?caller.entitlements.account_id, url = %link.url, "Chat link updated");
    Ok(link)
}
