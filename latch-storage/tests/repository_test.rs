mod common;

use latch_core::{
    run_in_transaction, AuthError, AuthRepository, NewRole, PermissionCode, RoleChanges,
    UnitOfWork, UserChanges,
};

use chrono::Utc;
use latch_storage::entities::Users;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};

use common::{new_user, TestDatabase};

async fn seed_codes(db: &TestDatabase, codes: &[&'static str]) -> Vec<i32> {
    let codes: Vec<&'static str> = codes.to_vec();
    run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move {
            let mut ids = Vec::new();
            for code in codes {
                ids.push(tx.upsert_permission(code).await?.0.id);
            }
            Ok(ids)
        })
    })
    .await
    .unwrap()
}

async fn create_role(db: &TestDatabase, name: &str, permission_ids: Vec<i32>) -> i32 {
    let role = NewRole {
        name: name.to_string(),
        description: None,
        active: true,
    };
    run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move {
            let id = tx.create_role(role).await?;
            tx.replace_role_permissions(id, &permission_ids).await?;
            Ok(id)
        })
    })
    .await
    .unwrap()
}

async fn create_user(db: &TestDatabase, email: &str, role_ids: Vec<i32>) -> i32 {
    let user = new_user(email, "$2b$04$hash");
    run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move {
            let id = tx.create_user(user).await?;
            tx.replace_user_roles(id, &role_ids).await?;
            Ok(id)
        })
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let db = TestDatabase::new().await;
    assert!(db.repository.health_check().await.is_ok());
}

#[tokio::test]
async fn test_user_is_hydrated_with_roles_permissions_and_tenants() {
    let db = TestDatabase::new().await;
    let perms = seed_codes(&db, &["create_user", "view_user"]).await;
    let role_id = create_role(&db, "operators", perms.clone()).await;
    let user_id = create_user(&db, "ops@example.com", vec![role_id]).await;
    let tenant_id = db.insert_tenant("north").await;

    run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move { tx.replace_user_tenants(user_id, &[tenant_id]).await })
    })
    .await
    .unwrap();

    let user = db
        .repository
        .find_user_by_email("ops@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.role_names(), vec!["operators".to_string()]);
    assert_eq!(user.roles[0].permissions.len(), 2);
    assert_eq!(user.permission_codes(), vec!["create_user", "view_user"]);
    assert_eq!(user.tenant_ids(), vec![tenant_id]);

    let by_id = db.repository.find_user_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(by_id, user);
}

#[tokio::test]
async fn test_unknown_user_is_none() {
    let db = TestDatabase::new().await;
    assert!(db.repository.find_user_by_id(42).await.unwrap().is_none());
    assert!(db
        .repository
        .find_user_by_email("nobody@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_find_by_ids_returns_only_existing_rows() {
    let db = TestDatabase::new().await;
    let perms = seed_codes(&db, &["view_role"]).await;

    let found = db
        .repository
        .find_permissions_by_ids(&[perms[0], 999])
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].code, "view_role");

    assert!(db.repository.find_roles_by_ids(&[5, 6]).await.unwrap().is_empty());
    assert!(db.repository.find_tenants_by_ids(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upsert_permission_keeps_existing_row() {
    let db = TestDatabase::new().await;

    let (first, created) = run_in_transaction(db.repository.as_ref(), |tx| {
        Box::pin(async move { tx.upsert_permission("create_role").await })
    })
    .await
    .unwrap();
    assert!(created);
    assert_eq!(first.name, "create_role");

    let (second, created) = run_in_transaction(db.repository.as_ref(), |tx| {
        Box::pin(async move { tx.upsert_permission("create_role").await })
    })
    .await
    .unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);

    let by_code = db
        .repository
        .find_permission_by_code(PermissionCode::CreateRole.as_str())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_code.id, first.id);
    assert_eq!(db.repository.list_permissions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_dropped_unit_of_work_rolls_back() {
    let db = TestDatabase::new().await;
    let perms = seed_codes(&db, &["view_user"]).await;
    let readers = create_role(&db, "readers", perms).await;
    let writers = create_role(&db, "writers", vec![]).await;
    let user_id = create_user(&db, "a@example.com", vec![readers]).await;
    create_user(&db, "b@example.com", vec![]).await;

    let result = run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move {
            tx.replace_user_roles(user_id, &[writers]).await?;
            // Email collides with the second user
            let changes = UserChanges {
                email: Some("b@example.com".to_string()),
                ..Default::default()
            };
            tx.update_user(user_id, &changes).await
        })
    })
    .await;
    assert!(matches!(result, Err(AuthError::Validation { .. })));

    let user = db.repository.find_user_by_id(user_id).await.unwrap().unwrap();
    assert_eq!(user.role_names(), vec!["readers".to_string()]);
    assert_eq!(user.email, "a@example.com");
}

#[tokio::test]
async fn test_duplicate_email_is_validation_error() {
    let db = TestDatabase::new().await;
    create_user(&db, "dup@example.com", vec![]).await;

    let user = new_user("dup@example.com", "x");
    let result = run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move { tx.create_user(user).await })
    })
    .await;
    assert!(matches!(result, Err(AuthError::Validation { .. })));
    assert_eq!(db.repository.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_replacing_role_permissions_bumps_holders() {
    let db = TestDatabase::new().await;
    let perms = seed_codes(&db, &["view_user", "update_user"]).await;
    let role_id = create_role(&db, "staff", vec![perms[0]]).await;
    let user_id = create_user(&db, "staff@example.com", vec![role_id]).await;
    let before = db.repository.find_user_by_id(user_id).await.unwrap().unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let all = perms.clone();
    run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move { tx.replace_role_permissions(role_id, &all).await })
    })
    .await
    .unwrap();

    let after = db.repository.find_user_by_id(user_id).await.unwrap().unwrap();
    assert!(after.updated_at > before.updated_at);
    assert_eq!(after.permission_codes(), vec!["update_user", "view_user"]);
}

#[tokio::test]
async fn test_update_role_columns() {
    let db = TestDatabase::new().await;
    let role_id = create_role(&db, "old", vec![]).await;

    let changes = RoleChanges {
        name: Some("new".to_string()),
        active: Some(false),
        ..Default::default()
    };
    run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move { tx.update_role(role_id, &changes).await })
    })
    .await
    .unwrap();

    let role = db.repository.find_role_by_id(role_id).await.unwrap().unwrap();
    assert_eq!(role.name, "new");
    assert!(!role.active);
    assert_eq!(db.repository.list_roles().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_first_or_create_user_is_idempotent() {
    let db = TestDatabase::new().await;

    let user = new_user("root@example.com", "h1");
    let (first, created) = run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move { tx.first_or_create_user(user).await })
    })
    .await
    .unwrap();
    assert!(created);

    let user = new_user("root@example.com", "h2");
    let (second, created) = run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move { tx.first_or_create_user(user).await })
    })
    .await
    .unwrap();
    assert!(!created);
    assert_eq!(first, second);

    let stored = db.repository.find_user_by_id(first).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, "h1");
}

#[tokio::test]
async fn test_first_or_create_user_leaves_soft_deleted_row_deleted() {
    let db = TestDatabase::new().await;
    let id = create_user(&db, "gone@example.com", vec![]).await;

    let model = Users::find_by_id(id)
        .one(db.connection.get_connection())
        .await
        .unwrap()
        .unwrap();
    let mut deleted = model.into_active_model();
    deleted.deleted_at = Set(Some(Utc::now()));
    deleted.update(db.connection.get_connection()).await.unwrap();

    let user = new_user("gone@example.com", "h2");
    let (found, created) = run_in_transaction(db.repository.as_ref(), move |tx| {
        Box::pin(async move { tx.first_or_create_user(user).await })
    })
    .await
    .unwrap();
    assert!(!created);
    assert_eq!(found, id);
    assert!(db
        .repository
        .find_user_by_email("gone@example.com")
        .await
        .unwrap()
        .is_none());
    assert!(db.repository.find_user_by_id(id).await.unwrap().is_none());
}
