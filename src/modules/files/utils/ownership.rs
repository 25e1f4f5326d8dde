//! Credential resolution and file ownership utilities

use std::path::Path;

use nix::unistd::{Gid, Group, Uid, User};

use super::FileError;

/// Resolve a user name and optional group name to numeric ids.
///
/// Numeric strings are accepted as raw ids. Without a group, the user's
/// primary group is used.
pub fn lookup_credential(user: &str, group: Option<&str>) -> Result<(Uid, Gid), FileError> {
    let (uid, primary_gid) = resolve_user(user)?;

    let gid = match group.filter(|g| !g.is_empty()) {
        Some(group) => resolve_group(group)?,
        None => primary_gid.ok_or_else(|| FileError::UnknownUser {
            user: user.to_string(),
        })?,
    };

    Ok((uid, gid))
}

fn resolve_user(user: &str) -> Result<(Uid, Option<Gid>), FileError> {
    let unknown = || FileError::UnknownUser {
        user: user.to_string(),
    };

    if let Ok(raw) = user.parse::<u32>() {
        let uid = Uid::from_raw(raw);
        let primary = User::from_uid(uid).ok().flatten().map(|u| u.gid);
        return Ok((uid, primary));
    }

    let entry = User::from_name(user).map_err(|_| unknown())?.ok_or_else(unknown)?;
    Ok((entry.uid, Some(entry.gid)))
}

fn resolve_group(group: &str) -> Result<Gid, FileError> {
    if let Ok(raw) = group.parse::<u32>() {
        return Ok(Gid::from_raw(raw));
    }

    let unknown = || FileError::UnknownGroup {
        group: group.to_string(),
    };
    Group::from_name(group)
        .map_err(|_| unknown())?
        .map(|g| g.gid)
        .ok_or_else(unknown)
}

/// Change owner and group of `path` to the ids resolved for `owner`/`group`
pub fn chown_path(path: &Path, owner: &str, group: Option<&str>) -> Result<(), FileError> {
    let (uid, gid) = lookup_credential(owner, group)?;
    tracing::debug!(
        "chown {} to {}:{}",
        path.display(),
        uid.as_raw(),
        gid.as_raw()
    );
    nix::unistd::chown(path, Some(uid), Some(gid)).map_err(|e| FileError::Io {
        source: std::io::Error::from(e),
    })
}
