use std::fmt;

use client_core::{DashboardView, LoadPhase, Notice};
use shared::domain::{ContactId, ContactView, IntroStatus};

pub const HELP: &str = "commands: r = refresh | s <row> or s id:<id> = send intro | q = quit";

const TITLE: &str = "Intro Mail Dashboard";

/// Draws one full frame of the dashboard.
pub fn render(view: &DashboardView) -> String {
    Frame(view).to_string()
}

struct Frame<'a>(&'a DashboardView);

impl fmt::Display for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let view = self.0;
        writeln!(f, "{TITLE}")?;

        match view.phase {
            LoadPhase::Loading => return writeln!(f, "Loading contacts..."),
            LoadPhase::Failed => writeln!(f, "Contacts could not be loaded. Type 'r' to retry.")?,
            LoadPhase::Ready => {
                writeln!(f, "Total: {} contacts", view.contacts.len())?;
                if view.contacts.is_empty() {
                    writeln!(f, "No contacts found")?;
                }
                for (index, contact) in view.contacts.iter().enumerate() {
                    write_row(f, index + 1, contact, view.sending.as_ref())?;
                }
            }
        }

        if let Some(notice) = &view.notice {
            writeln!(f, "> {}", notice_text(notice))?;
        }
        writeln!(f, "{HELP}")
    }
}

fn write_row(
    f: &mut fmt::Formatter<'_>,
    row: usize,
    contact: &ContactView,
    sending: Option<&ContactId>,
) -> fmt::Result {
    writeln!(f, "{row:>3}. {} <{}>", contact.contact.name, contact.contact.email)?;
    if let Some(company) = &contact.company_name {
        writeln!(f, "     {company}")?;
    }
    match contact.intro_status() {
        IntroStatus::Sent { at: Some(at) } => {
            writeln!(f, "     ✓ intro sent {}", at.format("%Y-%m-%d"))
        }
        IntroStatus::Sent { at: None } => writeln!(f, "     ✓ intro sent (date unknown)"),
        IntroStatus::Pending if sending == Some(contact.id()) => writeln!(f, "     [sending...]"),
        IntroStatus::Pending => writeln!(f, "     [send]"),
    }
}

fn notice_text(notice: &Notice) -> String {
    match notice {
        Notice::IntroSent { .. } => "Email sent successfully".to_string(),
        Notice::SendFailed { message, .. } => format!("Error: {message}"),
        Notice::SendBusy { in_flight } => {
            format!("A send to {in_flight} is still in flight; try again when it finishes")
        }
        Notice::FetchFailed { message } => message.clone(),
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
