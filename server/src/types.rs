use clipdeck_core::user::UserRecord;
use serde::Serialize;

/// Identity attached to every authenticated request and socket connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl From<&UserRecord> for SessionUser {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.as_str().to_owned(),
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub user: UserRecord,
}

impl AuthenticatedSession {
    pub fn user_id(&self) -> &str {
        self.user.id.as_str()
    }

    pub fn session_user(&self) -> SessionUser {
        SessionUser::from(&self.user)
    }
}
