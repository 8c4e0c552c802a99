use super::UserProfile;
use anyhow::Result;
use serde_json::Value;

/// Profile documents keyed by the user's email.
pub trait ProfileStore: Send + Sync {
    /// Returns the stored document for the given email.
    /// Returns Ok(None) if the user has no profile yet.
    fn get_document(&self, email: &str) -> Result<Option<Value>>;

    /// Replaces (or creates) the user's profile.
    fn save_profile(&self, email: &str, profile: &UserProfile) -> Result<()>;

    /// Deletes the user's profile.
    /// Returns Ok(false) if there was nothing to delete.
    fn delete_profile(&self, email: &str) -> Result<bool>;

    /// Returns the emails of all users with a stored profile, sorted.
    fn list_emails(&self) -> Result<Vec<String>>;

    fn get_profile(&self, email: &str) -> Result<Option<UserProfile>> {
        match self.get_document(email)? {
            None => Ok(None),
            Some(document) => Ok(Some(UserProfile::from_document(&document)?)),
        }
    }
}
