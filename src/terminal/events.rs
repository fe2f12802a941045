use chrono::Local;
use std::io::Write;

use crate::error::Result;
use crate::session::MailSession;
use crate::terminal::ui;

/// Messages shown per inbox listing, whatever the page size.
pub const INBOX_DISPLAY_LIMIT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Exit,
    DisplayToken,
    ListInbox,
    SendMail,
    ListUsers,
    MakeGraphCall,
}

impl Command {
    pub fn from_choice(choice: i64) -> Option<Self> {
        match choice {
            0 => Some(Self::Exit),
            1 => Some(Self::DisplayToken),
            2 => Some(Self::ListInbox),
            3 => Some(Self::SendMail),
            4 => Some(Self::ListUsers),
            5 => Some(Self::MakeGraphCall),
            _ => None,
        }
    }

    /// One input line to a command. Anything that is not a known number is
    /// `None`.
    pub fn parse(line: &str) -> Option<Self> {
        line.trim().parse::<i64>().ok().and_then(Self::from_choice)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub type Handler<S, W> = fn(&mut S, &mut W) -> Result<Flow>;

pub fn handler<S: MailSession, W: Write>(cmd: Command) -> Handler<S, W> {
    match cmd {
        Command::Exit => exit::<S, W>,
        Command::DisplayToken => display_access_token::<S, W>,
        Command::ListInbox => list_inbox::<S, W>,
        Command::SendMail => send_mail::<S, W>,
        Command::ListUsers => list_users::<S, W>,
        Command::MakeGraphCall => make_graph_call::<S, W>,
    }
}

pub fn dispatch<S: MailSession, W: Write>(
    cmd: Command,
    session: &mut S,
    out: &mut W,
) -> Result<Flow> {
    log::debug!("dispatching {cmd:?}");
    handler::<S, W>(cmd)(session, out)
}

fn exit<S: MailSession, W: Write>(_session: &mut S, out: &mut W) -> Result<Flow> {
    writeln!(out, "{}", ui::FAREWELL)?;
    Ok(Flow::Exit)
}

fn display_access_token<S: MailSession, W: Write>(session: &mut S, out: &mut W) -> Result<Flow> {
    let token = session.get_user_token()?;
    writeln!(out, "User token: {token}")?;
    Ok(Flow::Continue)
}

fn list_inbox<S: MailSession, W: Write>(session: &mut S, out: &mut W) -> Result<Flow> {
    let page = session.get_inbox()?;

    for message in page.value.iter().take(INBOX_DISPLAY_LIMIT) {
        ui::write_message_header(out, message)?;

        match message.id.as_deref() {
            Some(id) => match session.get_attachments(id) {
                Ok(attachments) => ui::write_attachments(out, &attachments)?,
                // one message's attachments failing does not stop the listing
                Err(e) => writeln!(out, "  ErrorGetAttachment: {e}")?,
            },
            None => log::warn!("message without id, skipping attachment lookup"),
        }

        ui::write_message_status(out, message, &Local)?;
    }

    writeln!(out)?;
    writeln!(out, "More messages available? {}", page.has_more())?;
    writeln!(out)?;
    Ok(Flow::Continue)
}

fn send_mail<S: MailSession, W: Write>(_session: &mut S, out: &mut W) -> Result<Flow> {
    not_implemented(out, "Send mail")
}

fn list_users<S: MailSession, W: Write>(_session: &mut S, out: &mut W) -> Result<Flow> {
    not_implemented(out, "List users")
}

fn make_graph_call<S: MailSession, W: Write>(_session: &mut S, out: &mut W) -> Result<Flow> {
    not_implemented(out, "Make a Graph call")
}

fn not_implemented<W: Write>(out: &mut W, what: &str) -> Result<Flow> {
    writeln!(out, "{what} is not implemented yet.")?;
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_menu_numbers() {
        assert_eq!(Command::parse("0\n"), Some(Command::Exit));
        assert_eq!(Command::parse(" 2 "), Some(Command::ListInbox));
        assert_eq!(Command::parse("5"), Some(Command::MakeGraphCall));
    }

    #[test]
    fn rejects_non_numeric_and_out_of_range() {
        assert_eq!(Command::parse("abc"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("6"), None);
        assert_eq!(Command::parse("-1"), None);
        assert_eq!(Command::parse("1.5"), None);
    }
}
