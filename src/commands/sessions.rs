//! `iz sessions` and `iz logout`.

use super::{Output, Status, confirm, json_of};
use crate::config::schema::Session;
use crate::config::store::ConfigPaths;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::{BufRead, Write};

#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub name: String,
    pub url: String,
    pub username: String,
    pub logged_in: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl SessionSummary {
    fn new(name: &str, session: &Session, active: bool) -> Self {
        Self {
            name: name.to_string(),
            url: session.url.clone(),
            username: session.username.clone(),
            logged_in: session.is_logged_in(),
            created_at: session.created_at,
            active,
        }
    }

    fn status(&self) -> &'static str {
        if self.logged_in {
            "logged in"
        } else {
            "logged out"
        }
    }
}

#[derive(Serialize)]
pub struct SessionList {
    pub active: Option<String>,
    pub sessions: Vec<SessionSummary>,
}

impl Output for SessionList {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.sessions.is_empty() {
            return "No sessions".to_string();
        }
        self.sessions
            .iter()
            .map(|s| {
                let marker = if s.active { "*" } else { " " };
                format!("{} {}  {}  {}  ({})", marker, s.name, s.url, s.username, s.status())
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn sessions_list(paths: &ConfigPaths) -> Result<SessionList> {
    let doc = paths.load_sessions()?;
    let sessions = doc
        .sessions
        .iter()
        .map(|(name, session)| SessionSummary::new(name, session, *name == doc.active))
        .collect();
    let active = doc
        .sessions
        .contains_key(&doc.active)
        .then(|| doc.active.clone());
    Ok(SessionList { active, sessions })
}

/// A session with the profiles that reference it. The token is never shown.
#[derive(Debug, Serialize)]
pub struct SessionShow {
    #[serde(flatten)]
    pub session: SessionSummary,
    pub referenced_by: Vec<String>,
}

impl Output for SessionShow {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        let s = &self.session;
        let mut lines = vec![
            format!("Session:  {}{}", s.name, if s.active { " (active)" } else { "" }),
            format!("URL:      {}", s.url),
            format!("Username: {}", s.username),
            format!("Status:   {}", s.status()),
        ];
        if let Some(created) = s.created_at {
            lines.push(format!("Created:  {}", created.to_rfc3339()));
        }
        if !self.referenced_by.is_empty() {
            lines.push(format!("Profiles: {}", self.referenced_by.join(", ")));
        }
        lines.join("\n")
    }
}

fn referencing_profiles(paths: &ConfigPaths, name: &str) -> Result<Vec<String>> {
    let config = paths.load_config()?;
    Ok(config
        .profiles
        .iter()
        .filter(|(_, p)| p.session == name)
        .map(|(n, _)| n.clone())
        .collect())
}

pub fn sessions_show(paths: &ConfigPaths, name: &str) -> Result<SessionShow> {
    let doc = paths.load_sessions()?;
    let session = doc
        .sessions
        .get(name)
        .ok_or_else(|| Error::not_found("Session", name))?;
    Ok(SessionShow {
        session: SessionSummary::new(name, session, doc.active == name),
        referenced_by: referencing_profiles(paths, name)?,
    })
}

#[derive(Serialize)]
pub struct SessionDelete {
    pub name: String,
    pub status: Status,
    /// Profiles left pointing at the deleted session
    pub referenced_by: Vec<String>,
}

impl Output for SessionDelete {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.status == Status::Cancelled {
            return "Delete cancelled".to_string();
        }
        let mut text = format!("Deleted session '{}'", self.name);
        if !self.referenced_by.is_empty() {
            text.push_str(&format!(
                "\nStill referenced by profiles: {}",
                self.referenced_by.join(", ")
            ));
        }
        text
    }

    fn is_informational(&self) -> bool {
        true
    }
}

/// Remove a session entry entirely.
///
/// Profiles that reference it are left as they are. Commands that need a
/// resolved configuration fail for them until `iz profile set session` fixes
/// the reference.
pub fn sessions_delete(
    paths: &ConfigPaths,
    name: &str,
    force: bool,
    input: &mut dyn BufRead,
    prompt: &mut dyn Write,
) -> Result<SessionDelete> {
    let mut doc = paths.load_sessions()?;
    if !doc.sessions.contains_key(name) {
        return Err(Error::not_found("Session", name));
    }
    let referenced_by = referencing_profiles(paths, name)?;
    if !force && !confirm(input, prompt, &format!("Delete session '{}'?", name))? {
        return Ok(SessionDelete {
            name: name.to_string(),
            status: Status::Cancelled,
            referenced_by,
        });
    }
    doc.sessions.remove(name);
    if doc.active == name {
        doc.active.clear();
    }
    paths.save_sessions(&doc)?;
    if !referenced_by.is_empty() {
        tracing::warn!(session = name, profiles = ?referenced_by, "deleted session is still referenced");
    }
    Ok(SessionDelete {
        name: name.to_string(),
        status: Status::Done,
        referenced_by,
    })
}

#[derive(Debug, Serialize)]
pub struct Logout {
    pub session: String,
    pub was_logged_in: bool,
}

impl Output for Logout {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        if self.was_logged_in {
            format!("Logged out of session '{}'", self.session)
        } else {
            format!("Session '{}' was already logged out", self.session)
        }
    }

    fn is_informational(&self) -> bool {
        true
    }
}

/// Clear the bearer token of a session, keeping the entry.
///
/// Without a name, the session selected for this invocation is used.
pub fn logout(paths: &ConfigPaths, name: Option<&str>, current: Option<&str>) -> Result<Logout> {
    let name = name.or(current).ok_or_else(|| Error::MissingRequired {
        what: "session".to_string(),
        hint: "name a session or select a profile that references one".to_string(),
    })?;
    let mut doc = paths.load_sessions()?;
    let session = doc
        .sessions
        .get_mut(name)
        .ok_or_else(|| Error::not_found("Session", name))?;
    let was_logged_in = session.is_logged_in();
    session.clear_token();
    paths.save_sessions(&doc)?;
    Ok(Logout {
        session: name.to_string(),
        was_logged_in,
    })
}
