//! Startup seeding of the permission catalog and the super-user

use tracing::info;

use latch_core::{
    run_in_transaction, AuthRepository, AuthResult, NewUser, PermissionCode, SuperUserProfile,
    UnitOfWork,
};

/// Create every missing permission code. Existing rows are not modified.
///
/// Returns how many rows were created.
pub async fn seed_permissions<R>(repo: &R, codes: &[PermissionCode]) -> AuthResult<usize>
where
    R: AuthRepository + ?Sized,
{
    let codes: Vec<&'static str> = codes.iter().map(PermissionCode::as_str).collect();
    let total = codes.len();

    let created = run_in_transaction(repo, move |tx| {
        Box::pin(async move {
            let mut created = 0;
            for code in codes {
                let (_, inserted) = tx.upsert_permission(code).await?;
                if inserted {
                    created += 1;
                }
            }
            Ok(created)
        })
    })
    .await?;

    info!("Seeded permissions: {} created, {} already present", created, total - created);
    Ok(created)
}

/// Make sure the configured super-user exists. An existing account with the
/// same email is left as is.
///
/// Returns the user id.
pub async fn seed_super_user<R>(repo: &R, profile: SuperUserProfile) -> AuthResult<i32>
where
    R: AuthRepository + ?Sized,
{
    let email = profile.email.clone();
    let user = NewUser {
        first_name: profile.first_name,
        last_name: profile.last_name,
        username: None,
        email: profile.email,
        password_hash: profile.password_hash,
        active: true,
        is_super_user: true,
        phone1: None,
        phone2: None,
    };

    let (user_id, created) = run_in_transaction(repo, move |tx| {
        Box::pin(async move { tx.first_or_create_user(user).await })
    })
    .await?;

    if created {
        info!("Created super-user {} ({})", user_id, email);
    } else {
        info!("Super-user {} already present", email);
    }
    Ok(user_id)
}
