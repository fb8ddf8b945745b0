use anyhow::Result;
use backmon_storage::{NewUser, Storage};

/// Seeds the default admin account on first boot.
///
/// Runs on every startup; a no-op once the account exists.
pub async fn ensure_admin_user(storage: &dyn Storage) -> Result<()> {
    if storage.get_user_by_username("admin").await?.is_some() {
        return Ok(());
    }
    let user = storage
        .create_user(NewUser {
            username: "admin".to_string(),
            password: "admin123".to_string(),
            role: "admin".to_string(),
        })
        .await?;
    tracing::warn!(
        user_id = user.id,
        "created default admin user with the default password; change it"
    );
    Ok(())
}
