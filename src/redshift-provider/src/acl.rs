// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Access control list decoding.
//!
//! Redshift stores default privileges in `pg_default_acl.defaclacl`, an array
//! of `aclitem`s whose text form is `grantee=privileges/grantor`, e.g.
//! `group analysts=arwdRxt/admin`. The grantee is empty for `PUBLIC`, a bare
//! name for users and `group <name>` for groups. Each privilege is a single
//! letter, optionally followed by `*` when it was granted with grant option.
//!
//! Only the table privileges this crate manages are kept in [`Privileges`].
//! Every other letter is dropped, including ones added by newer server
//! releases such as `P` (TRUNCATE) and `A` (ALTER).
//!
//! [`AclItem`]'s `Display` impl renders the catalog text form back, quoting
//! names the way the server does, which is not the SQL identifier rule used
//! in [`crate::sql`].

use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

/// Separator used when the catalog array is flattened with `array_to_string`.
pub const ACL_SEPARATOR: char = '|';

bitflags! {
    /// The table privileges managed by a schema/group privilege resource.
    ///
    /// Flags are declared in the order in which keywords appear in generated
    /// statements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Privileges: u8 {
        const SELECT = 1 << 0;
        const INSERT = 1 << 1;
        const UPDATE = 1 << 2;
        const DELETE = 1 << 3;
        const REFERENCES = 1 << 4;
    }
}

/// Letter codes, in the order Postgres prints them.
const ACL_CODES: [(char, Privileges); 5] = [
    ('a', Privileges::INSERT),
    ('r', Privileges::SELECT),
    ('w', Privileges::UPDATE),
    ('d', Privileges::DELETE),
    ('x', Privileges::REFERENCES),
];

impl Privileges {
    /// Builds a set from the five boolean flags of a declared resource.
    pub fn from_flags(
        select: bool,
        insert: bool,
        update: bool,
        delete: bool,
        references: bool,
    ) -> Privileges {
        let mut privileges = Privileges::empty();
        privileges.set(Privileges::SELECT, select);
        privileges.set(Privileges::INSERT, insert);
        privileges.set(Privileges::UPDATE, update);
        privileges.set(Privileges::DELETE, delete);
        privileges.set(Privileges::REFERENCES, references);
        privileges
    }

    /// The comma-separated SQL keyword list, e.g. `SELECT,INSERT`.
    pub fn to_keywords(&self) -> String {
        self.iter_names()
            .map(|(name, _)| name)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parses the privilege letters of an aclitem.
    ///
    /// Letters other than the managed ones are ignored; anything that is not
    /// a letter or a grant-option `*` is an error.
    pub fn from_acl_codes(codes: &str) -> Result<Privileges, AclParseError> {
        let mut privileges = Privileges::empty();
        for c in codes.chars() {
            if let Some((_, privilege)) = ACL_CODES.iter().find(|(code, _)| *code == c) {
                privileges |= *privilege;
            } else if c != '*' && !c.is_ascii_alphabetic() {
                return Err(AclParseError::UnknownPrivilege {
                    code: c,
                    privileges: codes.to_string(),
                });
            }
        }
        Ok(privileges)
    }

    /// Renders the aclitem letters for this set, the inverse of
    /// [`Privileges::from_acl_codes`] on managed letters.
    pub fn to_acl_codes(&self) -> String {
        ACL_CODES
            .iter()
            .filter(|(_, privilege)| self.contains(*privilege))
            .map(|(code, _)| *code)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclParseError {
    #[error("malformed acl item '{0}': missing '='")]
    MissingEquals(String),
    #[error("unknown privilege code '{code}' in '{privileges}'")]
    UnknownPrivilege { code: char, privileges: String },
}

/// The role an [`AclItem`] grants privileges to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grantee {
    Public,
    User(String),
    Group(String),
}

impl fmt::Display for Grantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grantee::Public => Ok(()),
            Grantee::User(name) => write!(f, "{}", quote_name(name)),
            Grantee::Group(name) => write!(f, "group {}", quote_name(name)),
        }
    }
}

/// A decoded `aclitem`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AclItem {
    pub grantee: Grantee,
    pub privileges: Privileges,
    pub grantor: Option<String>,
}

impl AclItem {
    pub fn parse(item: &str) -> Result<AclItem, AclParseError> {
        let eq = find_unquoted(item, '=')
            .ok_or_else(|| AclParseError::MissingEquals(item.to_string()))?;
        let (grantee, rest) = (&item[..eq], &item[eq + 1..]);
        let (codes, grantor) = match rest.split_once('/') {
            Some((codes, grantor)) => (codes, Some(unquote(grantor))),
            None => (rest, None),
        };
        Ok(AclItem {
            grantee: parse_grantee(grantee),
            privileges: Privileges::from_acl_codes(codes)?,
            grantor,
        })
    }
}

impl fmt::Display for AclItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.grantee, self.privileges.to_acl_codes())?;
        if let Some(grantor) = &self.grantor {
            write!(f, "/{}", quote_name(grantor))?;
        }
        Ok(())
    }
}

/// Decodes a flattened `defaclacl` array, as produced by
/// `array_to_string(defaclacl, '|')`.
pub fn parse_acl(acl: &str) -> Result<Vec<AclItem>, AclParseError> {
    split_unquoted(acl, ACL_SEPARATOR)
        .into_iter()
        .filter(|item| !item.is_empty())
        .map(AclItem::parse)
        .collect()
}

/// Returns the managed privileges held by `group`, or `None` if no item
/// names the group as grantee.
pub fn group_privileges(items: &[AclItem], group: &str) -> Option<Privileges> {
    items
        .iter()
        .filter(|item| matches!(&item.grantee, Grantee::Group(name) if name == group))
        .map(|item| item.privileges)
        .reduce(|a, b| a | b)
}

fn parse_grantee(raw: &str) -> Grantee {
    if raw.is_empty() {
        return Grantee::Public;
    }
    let name = unquote(raw);
    match name.strip_prefix("group ") {
        Some(group) => Grantee::Group(unquote(group)),
        None => Grantee::User(name),
    }
}

fn unquote(s: &str) -> String {
    match s.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => s.to_string(),
    }
}

/// Quotes a name unless it is made only of alphanumerics and `_`, as the
/// server does when printing an aclitem.
fn quote_name(name: &str) -> String {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn find_unquoted(s: &str, needle: char) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == needle && !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

fn split_unquoted(s: &str, separator: char) -> Vec<&str> {
    let mut parts = vec![];
    let mut rest = s;
    while let Some(i) = find_unquoted(rest, separator) {
        parts.push(&rest[..i]);
        rest = &rest[i + separator.len_utf8()..];
    }
    parts.push(rest);
    parts
}
