//! Document type names and well-known field names.

/// Document type of CMS user accounts.
pub const USER_TYPE: &str = "apostrophe-user";

/// Document type of articles (blog posts).
pub const ARTICLE_TYPE: &str = "apostrophe-blog";

/// Document type of user profiles.
pub const PROFILE_TYPE: &str = "profile";

/// Document type of reader comments.
pub const COMMENT_TYPE: &str = "comment";

/// Document type of migration ledger entries.
pub const MIGRATION_TYPE: &str = "apostrophe-migration";

/// Primary key of every document.
pub const ID_FIELD: &str = "_id";

/// Discriminator of every document.
pub const TYPE_FIELD: &str = "type";

/// Legacy article author reference, and the profile's owning user.
pub const USER_ID_FIELD: &str = "userId";

/// Article author reference to a profile.
pub const USER_PROFILE_ID_FIELD: &str = "userProfileId";
