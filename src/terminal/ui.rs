use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;
use std::io::{self, Write};

use crate::graph::models::{Attachment, AttachmentPage, Message, User};

pub const MENU: &[&str] = &[
    "0. Exit",
    "1. Display access token",
    "2. List my inbox",
    "3. Send mail",
    "4. List users (requires app-only)",
    "5. Make a Graph call",
];

pub const INVALID_CHOICE: &str = "Invalid choice! Please try again.";
pub const FAREWELL: &str = "Goodbye...";

const UNKNOWN: &str = "(unknown)";

pub fn write_menu<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "Please choose one of the following options:")?;
    for line in MENU {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

pub fn write_greeting<W: Write>(out: &mut W, user: &User) -> io::Result<()> {
    writeln!(
        out,
        "Hello, {}!",
        user.display_name.as_deref().unwrap_or("there")
    )?;
    writeln!(out, "Email: {}", user.email().unwrap_or(UNKNOWN))?;
    writeln!(out)
}

pub fn write_message_header<W: Write>(out: &mut W, message: &Message) -> io::Result<()> {
    writeln!(
        out,
        "Message: {}",
        message.subject.as_deref().unwrap_or("(no subject)")
    )?;
    writeln!(out, "  From: {}", message.sender_name().unwrap_or(UNKNOWN))
}

pub fn write_attachments<W: Write>(out: &mut W, page: &AttachmentPage) -> io::Result<()> {
    for a in &page.value {
        write_attachment(out, a)?;
    }
    Ok(())
}

fn write_attachment<W: Write>(out: &mut W, a: &Attachment) -> io::Result<()> {
    writeln!(out, "  type: {}", a.content_type.as_deref().unwrap_or(UNKNOWN))?;
    match a.size {
        Some(size) => writeln!(out, "  size: {size}")?,
        None => writeln!(out, "  size: {UNKNOWN}")?,
    }
    writeln!(out, "  id: {}", a.id.as_deref().unwrap_or(UNKNOWN))?;
    writeln!(out, "  name: {}", a.name.as_deref().unwrap_or(UNKNOWN))
}

pub fn write_message_status<W, Tz>(out: &mut W, message: &Message, tz: &Tz) -> io::Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    writeln!(out, "  Status: {}", read_status(message.is_read))?;
    writeln!(
        out,
        "  Received: {}",
        format_received(message.received_date_time, tz)
    )
}

pub fn read_status(is_read: Option<bool>) -> &'static str {
    match is_read {
        Some(true) => "Read",
        Some(false) => "Unread",
        None => "Unknown",
    }
}

/// Graph timestamps are UTC; render them in `tz` (the local zone at runtime).
pub fn format_received<Tz>(ts: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match ts {
        Some(t) => t
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S %:z")
            .to_string(),
        None => UNKNOWN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
    {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn received_is_shifted_into_target_zone() {
        let ts = "2024-03-05T23:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let cet = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(format_received(Some(ts), &cet), "2024-03-06 00:30:00 +01:00");
        assert_eq!(format_received(Some(ts), &Utc), "2024-03-05 23:30:00 +00:00");
        assert_eq!(format_received(None, &Utc), "(unknown)");
    }

    #[test]
    fn status_reflects_read_flag() {
        assert_eq!(read_status(Some(true)), "Read");
        assert_eq!(read_status(Some(false)), "Unread");
        assert_eq!(read_status(None), "Unknown");
    }

    #[test]
    fn greeting_uses_principal_name_when_mail_missing() {
        let user = User {
            display_name: Some("Ada".into()),
            mail: None,
            user_principal_name: Some("x@y.com".into()),
        };
        let text = render(|out| write_greeting(out, &user));
        assert_eq!(text, "Hello, Ada!\nEmail: x@y.com\n\n");
    }

    #[test]
    fn attachment_lines_tolerate_missing_fields() {
        let page = AttachmentPage::new(vec![Attachment {
            id: Some("att1".into()),
            content_type: Some("image/png".into()),
            ..Default::default()
        }]);
        let text = render(|out| write_attachments(out, &page));
        assert_eq!(
            text,
            "  type: image/png\n  size: (unknown)\n  id: att1\n  name: (unknown)\n"
        );
    }

    #[test]
    fn menu_lists_all_choices() {
        let text = render(|out| write_menu(out));
        assert_eq!(text.lines().count(), 1 + MENU.len());
        assert!(text.contains("2. List my inbox"));
    }
}
