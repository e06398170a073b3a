//! User identity types.

use serde::{Deserialize, Serialize};

use super::comment::CommentAuthor;

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// User ID.
    pub id: String,

    /// Display name.
    pub username: String,

    /// Email address.
    pub email: String,

    /// Role name (admin, editor, writer, reader).
    pub role: String,
}

impl UserIdentity {
    /// Returns the author reference used on comments written by this user.
    #[must_use]
    pub fn as_author(&self) -> CommentAuthor {
        CommentAuthor {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}
