use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Makes sure the configured superadmin exists and can log in with the configured password.
pub(crate) async fn ensure_superuser(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_superuser_password.is_empty() {
        tracing::warn!("FIRST_SUPERUSER_PASSWORD not configured; skipping superuser creation");
        return Ok(());
    }

    let username = &admin.first_superuser_username;
    let now = primitive_now_utc();

    if let Some(user) = repositories::users::find_by_username(state.db(), username).await? {
        let verified =
            security::verify_password(&admin.first_superuser_password, &user.hashed_password)
                .unwrap_or(false);

        if verified {
            tracing::info!(username = %username, "Default superuser already up to date");
        } else {
            let hashed = security::hash_password(&admin.first_superuser_password)?;
            repositories::users::update_password(state.db(), &user.id, &hashed, now).await?;
            tracing::info!(username = %username, "Rotated default superuser password");
        }

        if user.role != UserRole::Superadmin {
            tracing::warn!(username = %username, role = ?user.role, "Configured superuser has a non-superadmin role");
        }
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_superuser_password)?;
    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            username,
            hashed_password,
            full_name: "Super Admin",
            role: UserRole::Superadmin,
            school_id: None,
            class_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await?;

    tracing::info!(username = %username, "Created default superuser");
    Ok(())
}
