use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{unauthorized_error, Error};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl User {
    pub fn new_system_user() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: vec!["system".into(), "admin".into()],
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|x| x == role)
    }

    pub fn require_role(&self, role: &str) -> Result<(), Error> {
        if self.has_role(role) || self.has_role("system") {
            return Ok(());
        }

        Err(unauthorized_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_user_passes_role_checks() {
        let user = User::new_system_user();
        assert!(user.require_role("admin").is_ok());
        assert!(user.require_role("anything").is_ok());
    }

    #[test]
    fn missing_role_is_rejected() {
        let user = User {
            id: Uuid::new_v4(),
            roles: vec!["viewer".into()],
        };
        assert!(user.require_role("admin").is_err());
        assert!(user.has_role("viewer"));
    }
}
