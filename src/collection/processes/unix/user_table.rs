use std::{ffi::CStr, sync::Arc};

use hashbrown::HashMap;

use crate::collection::{
    error::{CollectionError, CollectionResult},
    processes::{Gid, Uid},
};

/// Caches uid and gid lookups, which otherwise hit the passwd and group databases
/// for every process on every refresh.
#[derive(Debug, Default)]
pub struct UserTable {
    pub uid_user_mapping: HashMap<Uid, Arc<str>>,
    pub gid_group_mapping: HashMap<Gid, Arc<str>>,
    pub name_uid_mapping: HashMap<String, Option<Uid>>,
}

impl UserTable {
    /// Get the username associated with a UID. On first access of a name, it will
    /// be cached for future accesses.
    pub fn uid_to_username(&mut self, uid: Uid) -> CollectionResult<Arc<str>> {
        if let Some(user) = self.uid_user_mapping.get(&uid) {
            Ok(user.clone())
        } else {
            // SAFETY: getpwuid returns a null pointer if no passwd entry is found for the uid which we check.
            let passwd = unsafe { libc::getpwuid(uid) };

            if passwd.is_null() {
                Err("passwd is inaccessible".into())
            } else {
                // SAFETY: We return early if passwd is null.
                let username: Arc<str> = unsafe { CStr::from_ptr((*passwd).pw_name) }
                    .to_str()
                    .map_err(|err| CollectionError::General(err.into()))?
                    .into();

                self.uid_user_mapping.insert(uid, username.clone());

                Ok(username)
            }
        }
    }

    /// Get the group name associated with a GID, cached the same way as users.
    pub fn gid_to_groupname(&mut self, gid: Gid) -> CollectionResult<Arc<str>> {
        if let Some(group) = self.gid_group_mapping.get(&gid) {
            Ok(group.clone())
        } else {
            // SAFETY: getgrgid returns a null pointer if no group entry is found for the gid which we check.
            let group = unsafe { libc::getgrgid(gid) };

            if group.is_null() {
                Err("group is inaccessible".into())
            } else {
                // SAFETY: We return early if group is null.
                let name: Arc<str> = unsafe { CStr::from_ptr((*group).gr_name) }
                    .to_str()
                    .map_err(|err| CollectionError::General(err.into()))?
                    .into();

                self.gid_group_mapping.insert(gid, name.clone());

                Ok(name)
            }
        }
    }

    /// Like [`UserTable::uid_to_username`], but falls back to the number itself.
    pub fn user_or_uid(&mut self, uid: Uid) -> Arc<str> {
        self.uid_to_username(uid)
            .unwrap_or_else(|_| Arc::from(uid.to_string()))
    }

    /// Like [`UserTable::gid_to_groupname`], but falls back to the number itself.
    pub fn group_or_gid(&mut self, gid: Gid) -> Arc<str> {
        self.gid_to_groupname(gid)
            .unwrap_or_else(|_| Arc::from(gid.to_string()))
    }

    /// Reverse lookup of a user name. Misses are cached too.
    pub fn username_to_uid(&mut self, name: &str) -> Option<Uid> {
        if let Some(uid) = self.name_uid_mapping.get(name) {
            return *uid;
        }

        let uid = std::ffi::CString::new(name).ok().and_then(|c_name| {
            // SAFETY: c_name is a valid NUL-terminated string, and getpwnam returns a null
            // pointer if there is no entry, which we check.
            let passwd = unsafe { libc::getpwnam(c_name.as_ptr()) };

            if passwd.is_null() {
                None
            } else {
                // SAFETY: We checked that passwd is not null.
                Some(unsafe { (*passwd).pw_uid })
            }
        });

        self.name_uid_mapping.insert(name.to_string(), uid);

        uid
    }
}
