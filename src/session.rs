use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

/// Login state owned by the daemon for the lifetime of the process (or until
/// the workspace changes).
#[derive(Debug, Default)]
pub struct SessionContext {
    user: Option<AuthUser>,
    csrf_token: Option<String>,
}

impl SessionContext {
    /// Starts a session and mints a fresh CSRF token, replacing any previous one.
    pub fn login(&mut self, user: AuthUser) -> &str {
        self.user = Some(user);
        self.csrf_token.insert(mint_csrf_token())
    }

    pub fn logout(&mut self) {
        self.user = None;
        self.csrf_token = None;
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub fn snapshot(&self) -> RequestContext {
        RequestContext {
            user: self.user.clone(),
            csrf_token: self.csrf_token.clone(),
        }
    }
}

/// Read-only view of the session handed to a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user: Option<AuthUser>,
    csrf_token: Option<String>,
}

impl RequestContext {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn verify_csrf(&self, presented: Option<&str>) -> bool {
        match (self.csrf_token.as_deref(), presented) {
            (Some(expected), Some(given)) => constant_time_eq(expected.as_bytes(), given.as_bytes()),
            _ => false,
        }
    }
}

/// 64 hex characters from two v4 UUIDs.
pub fn mint_csrf_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// bcrypt work factor; matches PHP's `password_hash` default.
pub const PASSWORD_COST: u32 = 10;

/// Salted bcrypt hash in modular crypt format (`$2b$10$...`).
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, PASSWORD_COST)
}

/// A malformed stored hash never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(password, stored_hash).unwrap_or(false)
}
