//! Parsing of prompt lines into dashboard commands.

use shared::domain::{ContactId, ContactView};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    /// Empty line: draw the current frame again.
    Redraw,
    Refresh,
    Send(SendTarget),
    Help,
    Quit,
}

/// Which row a send applies to, as typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendTarget {
    /// 1-based position in the rendered list.
    Row(usize),
    Id(ContactId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}', type 'h' for help")]
    Unknown(String),
    #[error("usage: s <row> | s id:<contact-id>")]
    MissingTarget,
    #[error("'{0}' is not a row number")]
    BadRow(String),
    #[error("no row {0} in the current list")]
    NoSuchRow(usize),
    #[error("no contact with id {0} in the current list")]
    NoSuchContact(ContactId),
    #[error("intro already sent to {0}")]
    AlreadySent(String),
}

pub fn parse_command(line: &str) -> Result<DashboardCommand, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(DashboardCommand::Redraw);
    };

    match verb.to_ascii_lowercase().as_str() {
        "r" | "refresh" => Ok(DashboardCommand::Refresh),
        "h" | "help" | "?" => Ok(DashboardCommand::Help),
        "q" | "quit" | "exit" => Ok(DashboardCommand::Quit),
        "s" | "send" => {
            let target = words.next().ok_or(CommandError::MissingTarget)?;
            parse_target(target).map(DashboardCommand::Send)
        }
        other => Err(CommandError::Unknown(other.to_string())),
    }
}

fn parse_target(raw: &str) -> Result<SendTarget, CommandError> {
    if let Some(id) = raw.strip_prefix("id:") {
        if id.is_empty() {
            return Err(CommandError::MissingTarget);
        }
        return Ok(SendTarget::Id(ContactId::from(id)));
    }
    raw.parse::<usize>()
        .ok()
        .filter(|row| *row > 0)
        .map(SendTarget::Row)
        .ok_or_else(|| CommandError::BadRow(raw.to_string()))
}

impl SendTarget {
    /// Picks the contact out of the rows currently on screen. Rows that
    /// already show a sent marker have no send trigger.
    pub fn resolve(&self, contacts: &[ContactView]) -> Result<ContactId, CommandError> {
        let view = match self {
            SendTarget::Row(row) => row
                .checked_sub(1)
                .and_then(|index| contacts.get(index))
                .ok_or(CommandError::NoSuchRow(*row))?,
            SendTarget::Id(id) => contacts
                .iter()
                .find(|view| view.id() == id)
                .ok_or_else(|| CommandError::NoSuchContact(id.clone()))?,
        };
        if view.contact.intro_sent {
            return Err(CommandError::AlreadySent(view.contact.name.clone()));
        }
        Ok(view.id().clone())
    }
}
