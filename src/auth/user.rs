//! The authenticated-user record, mirroring the role `UserDetail`/`DefaultUser` play in
//! `libunftp`, minus the FTP-specific storage-permission bitflags — here the allow-list (C2)
//! already carries per-user scope.

use crate::policy::PathAllowList;

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    /// `<userBasePath>/<username>`.
    pub home_prefix: String,
    pub allow_list: PathAllowList,
}

impl User {
    pub fn new(username: impl Into<String>, user_base_path: &str) -> Self {
        let username = username.into();
        let home_prefix = format!("{}/{}", user_base_path, username);
        User {
            username,
            home_prefix,
            allow_list: PathAllowList::default(),
        }
    }
}
