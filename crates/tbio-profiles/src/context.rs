//! Per-request context handed to insert hooks.

use tbio_docs::User;

/// Who is performing an insert.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    user: Option<User>,
}

impl RequestContext {
    /// Request with no authenticated user (public submissions, system tasks).
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: User) -> Self {
        Self { user: Some(user) }
    }

    /// The currently authenticated user, if any.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}
