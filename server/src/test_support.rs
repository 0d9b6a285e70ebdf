#![allow(dead_code)]

use clipdeck_core::{
    config::AppConfig,
    db::Database,
    membership::{MemberRecord, MemberRole},
    space::{SpaceRecord, SpaceType},
    user::UserRecord,
    workspace::{WorkspaceRecord, WorkspaceType},
};
use tempfile::TempDir;

use crate::state::{AppState, build_state};

pub(crate) async fn setup_state() -> (TempDir, Database, AppState) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let config = AppConfig {
        database_path: temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned(),
        ..AppConfig::default()
    };

    let database = Database::connect(&config).await.expect("connect database");
    database.migrate().await.expect("apply migrations");

    let state = build_state(&database, &config);
    (temp_dir, database, state)
}

pub(crate) async fn create_user(state: &AppState, email: &str) -> UserRecord {
    state
        .user_store
        .create(email, None)
        .await
        .expect("create user")
}

pub(crate) async fn create_workspace(
    state: &AppState,
    owner: &UserRecord,
    name: &str,
) -> WorkspaceRecord {
    state
        .workspace_store
        .create(owner.id.as_str(), name, WorkspaceType::Public)
        .await
        .expect("create workspace")
}

pub(crate) async fn add_member(
    state: &AppState,
    workspace: &WorkspaceRecord,
    user: &UserRecord,
    role: MemberRole,
) -> MemberRecord {
    state
        .membership_store
        .insert_member(workspace.id.as_str(), user.id.as_str(), role)
        .await
        .expect("insert member")
}

pub(crate) async fn create_space(
    state: &AppState,
    workspace: &WorkspaceRecord,
    name: &str,
    granted_users: &[&UserRecord],
) -> SpaceRecord {
    let user_ids: Vec<String> = granted_users
        .iter()
        .map(|user| user.id.as_str().to_owned())
        .collect();

    state
        .space_store
        .create_with_grants(workspace.id.as_str(), name, SpaceType::Custom, &user_ids)
        .await
        .expect("create space")
}
