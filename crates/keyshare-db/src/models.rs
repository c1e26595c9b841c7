/// Database row types. These map directly to SQLite rows and stay
/// independent of the directory records in keyshare-types.

pub struct SessionRow {
    pub hostname: String,
    pub token: String,
    pub username: Option<String>,
    pub organization_id: Option<String>,
    pub created_at: String,
}

pub struct DeviceRow {
    pub public_key: String,
    pub private_key: String,
    pub created_at: String,
}

pub struct UserKeyRow {
    pub public_key: String,
    pub private_key_encrypted: String,
    pub created_at: String,
}
