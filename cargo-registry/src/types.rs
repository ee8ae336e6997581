//! Identities the registry acts on behalf of.

use crate::validation::{validate_owner_name, ValidationError, ValidationResult};
use serde::{Deserialize, Serialize};

/// Visibility of a package owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    /// Visible to signed-in users only.
    Limited,
    Private,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }
}

impl std::str::FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "limited" => Ok(Visibility::Limited),
            "private" => Ok(Visibility::Private),
            other => Err(format!("unknown visibility '{other}'")),
        }
    }
}

/// The user or organization that owns packages and an index repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOwner")]
pub struct Owner {
    pub name: String,
    pub visibility: Visibility,
}

#[derive(Deserialize)]
struct RawOwner {
    name: String,
    #[serde(default)]
    visibility: Visibility,
}

impl TryFrom<RawOwner> for Owner {
    type Error = ValidationError;

    fn try_from(raw: RawOwner) -> Result<Self, Self::Error> {
        Owner::new(raw.name, raw.visibility)
    }
}

impl Owner {
    /// Fails when `name` is not a valid owner name.
    pub fn new(name: impl Into<String>, visibility: Visibility) -> ValidationResult<Self> {
        let name = name.into();
        validate_owner_name(&name)?;
        Ok(Self { name, visibility })
    }

    pub fn public(name: impl Into<String>) -> ValidationResult<Self> {
        Self::new(name, Visibility::Public)
    }
}

/// The acting user; recorded as author and committer of index commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub email: String,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}
