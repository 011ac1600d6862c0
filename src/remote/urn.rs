// src/remote/urn.rs

//! `urn:ccnet:<server>[:<project>[:<item>]]` addresses.

use std::fmt;
use std::str::FromStr;

use crate::errors::UrnError;

pub const URN_PREFIX: &str = "urn:ccnet:";

/// Parsed remote action address.
///
/// An empty `server` means "this server". A URN without a project addresses
/// the server itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Urn {
    pub server: String,
    pub project: Option<String>,
    pub item: Option<String>,
}

impl Urn {
    pub fn server(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            project: None,
            item: None,
        }
    }

    pub fn project(server: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            project: Some(project.into()),
            item: None,
        }
    }

    pub fn item(
        server: impl Into<String>,
        project: impl Into<String>,
        item: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            project: Some(project.into()),
            item: Some(item.into()),
        }
    }

    /// True when the URN should be handled by the server called `local`.
    pub fn is_local_to(&self, local: &str) -> bool {
        self.server.is_empty() || self.server.eq_ignore_ascii_case(local)
    }

    /// Resolve a force-build target written as `project`, `server:project`
    /// or a full URN. A bare project name lives on `local_server`.
    pub fn resolve_target(target: &str, local_server: &str) -> Result<Urn, UrnError> {
        let target = target.trim();
        if has_prefix(target) {
            let urn: Urn = target.parse()?;
            if urn.project.is_none() {
                return Err(UrnError {
                    urn: target.to_string(),
                    reason: "target must name a project".to_string(),
                });
            }
            return Ok(urn);
        }
        match target.split_once(':') {
            Some((server, project)) if !project.is_empty() && !project.contains(':') => {
                Ok(Urn::project(server, project))
            }
            Some(_) => Err(UrnError {
                urn: target.to_string(),
                reason: "expected 'project' or 'server:project'".to_string(),
            }),
            None if target.is_empty() => Err(UrnError {
                urn: target.to_string(),
                reason: "target project name is empty".to_string(),
            }),
            None => Ok(Urn::project(local_server, target)),
        }
    }
}

fn has_prefix(s: &str) -> bool {
    s.get(..URN_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(URN_PREFIX))
}

impl FromStr for Urn {
    type Err = UrnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| UrnError {
            urn: s.to_string(),
            reason: reason.to_string(),
        };

        if !has_prefix(s) {
            return Err(fail("must start with 'urn:ccnet:'"));
        }
        let rest = &s[URN_PREFIX.len()..];
        let parts: Vec<&str> = rest.split(':').collect();

        match parts.as_slice() {
            [server] => Ok(Urn::server(*server)),
            [_, ""] | [_, "", _] => Err(fail("project segment is empty")),
            [_, _, ""] => Err(fail("item segment is empty")),
            [server, project] => Ok(Urn::project(*server, *project)),
            [server, project, item] => Ok(Urn::item(*server, *project, *item)),
            _ => Err(fail("too many segments")),
        }
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{URN_PREFIX}{}", self.server)?;
        if let Some(project) = &self.project {
            write!(f, ":{project}")?;
            if let Some(item) = &self.item {
                write!(f, ":{item}")?;
            }
        }
        Ok(())
    }
}
