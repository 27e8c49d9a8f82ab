/// Database row types. These map directly to SQLite rows.
/// Distinct from lounge-types models to keep the DB layer independent.

pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub body: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: i64,
    pub author: String,
    pub title: String,
    pub content: String,
    pub created_at: String,
}
