use serde::{Deserialize, Serialize};

/// Staff roles. Resolved upstream by the login flow; the core only ever
/// receives an already-authenticated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Tattooist,
}

/// The authenticated caller of a service operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub username: String,
    pub role: Role,
}

impl Actor {
    pub fn admin(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: Role::Admin,
        }
    }

    pub fn tattooist(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role: Role::Tattooist,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admins see every tattooist's data; a tattooist only their own.
    pub fn can_view(&self, tattooist: &str) -> bool {
        self.is_admin() || self.username == tattooist
    }
}
