//! File permission utilities

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use super::FileError;
use crate::modules::error::ValidationError;

const NUMERIC_VOCABULARY: &str = "1234567890";
const SYMBOLIC_VOCABULARY: &str = "+-=ugorwx,";

/// Requested permission change, either absolute octal bits or symbolic clauses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeSpec {
    Numeric(u32),
    Symbolic(Vec<ModeClause>),
}

/// One symbolic clause such as `u+x` or `go=rw`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeClause {
    pub roles: String,
    pub op: ModeOp,
    pub perms: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOp {
    Add,
    Remove,
    Set,
}

impl ModeSpec {
    /// Parse a mode argument. The string must be purely numeric or purely
    /// symbolic.
    pub fn parse(mode: &str) -> Result<Self, ValidationError> {
        let content_error = || ValidationError::FileModeContentError {
            mode: mode.to_string(),
        };

        if mode.is_empty() {
            return Err(content_error());
        }

        if uses_only(mode, NUMERIC_VOCABULARY) {
            let bits = u32::from_str_radix(mode, 8).map_err(|_| content_error())?;
            if bits > 0o7777 {
                return Err(content_error());
            }
            return Ok(ModeSpec::Numeric(bits));
        }

        if !uses_only(mode, SYMBOLIC_VOCABULARY) {
            return Err(content_error());
        }

        let mut clauses = Vec::new();
        for part in mode.split(',').filter(|p| !p.is_empty()) {
            clauses.push(ModeClause::parse(part).ok_or_else(content_error)?);
        }
        if clauses.is_empty() {
            return Err(content_error());
        }
        Ok(ModeSpec::Symbolic(clauses))
    }

    /// Compute the new permission bits starting from `current`
    pub fn resolve(&self, current: u32) -> u32 {
        match self {
            ModeSpec::Numeric(bits) => *bits,
            ModeSpec::Symbolic(clauses) => {
                let current_str = mode_to_symbolic(current);
                let mut classes = [
                    current_str[0..3].to_string(),
                    current_str[3..6].to_string(),
                    current_str[6..9].to_string(),
                ];

                for clause in clauses {
                    for role in clause.roles.chars() {
                        let idx = match role {
                            'u' => 0,
                            'g' => 1,
                            _ => 2,
                        };
                        classes[idx] = clause.apply(&classes[idx]);
                    }
                }

                let bits = (chmod_bits(&classes[0]) << 6)
                    | (chmod_bits(&classes[1]) << 3)
                    | chmod_bits(&classes[2]);
                (current & 0o7000) | bits
            }
        }
    }
}

impl ModeClause {
    fn parse(clause: &str) -> Option<Self> {
        let (op, sep) = if clause.contains('=') {
            (ModeOp::Set, '=')
        } else if clause.contains('-') {
            (ModeOp::Remove, '-')
        } else if clause.contains('+') {
            (ModeOp::Add, '+')
        } else {
            return None;
        };

        let fields: Vec<&str> = clause.split(sep).collect();
        if fields.len() != 2 {
            return None;
        }
        let (roles, perms) = (fields[0], fields[1]);
        if roles.is_empty() || !uses_only(roles, "ugo") || !uses_only(perms, "rwx") {
            return None;
        }

        Some(Self {
            roles: roles.to_string(),
            op,
            perms: perms.to_string(),
        })
    }

    /// Apply this clause to one `rwx` triplet
    fn apply(&self, old: &str) -> String {
        let old: Vec<char> = old.chars().collect();
        ['r', 'w', 'x']
            .iter()
            .enumerate()
            .map(|(i, &bit)| {
                let requested = self.perms.contains(bit);
                match self.op {
                    ModeOp::Add if requested => bit,
                    ModeOp::Remove if requested => '-',
                    ModeOp::Set if requested => bit,
                    ModeOp::Set => '-',
                    _ => old[i],
                }
            })
            .collect()
    }
}

fn uses_only(s: &str, vocabulary: &str) -> bool {
    s.chars().all(|c| vocabulary.contains(c))
}

/// Numeric value of one `rwx` triplet, e.g. `r-x` is 5. Unrecognised triplets
/// fall back to read-only.
pub fn chmod_bits(triplet: &str) -> u32 {
    match triplet {
        "---" => 0,
        "--x" => 1,
        "-w-" => 2,
        "-wx" => 3,
        "r--" => 4,
        "r-x" => 5,
        "rw-" => 6,
        "rwx" => 7,
        _ => 4,
    }
}

/// Render the lower nine permission bits as `rwxr-xr-x`
pub fn mode_to_symbolic(mode: u32) -> String {
    let flags = ['r', 'w', 'x'];
    (0..9)
        .map(|i| {
            if mode & (0o400 >> i) != 0 {
                flags[i % 3]
            } else {
                '-'
            }
        })
        .collect()
}

/// Current permission bits of `path` (file type bits stripped)
pub async fn get_mode(path: &Path) -> Result<u32, FileError> {
    let metadata = tokio::fs::metadata(path).await?;
    Ok(metadata.permissions().mode() & 0o7777)
}

pub async fn set_mode(path: &Path, mode: u32) -> Result<(), FileError> {
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    Ok(())
}
