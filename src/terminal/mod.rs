pub mod events;
pub mod ui;

use std::io::{BufRead, Write};

use crate::error::Result;
use crate::session::MailSession;
use events::{Command, Flow};

/// Print "Hello" plus the user's address before the menu loop.
pub fn greet_user<S: MailSession, W: Write>(session: &mut S, out: &mut W) -> Result<()> {
    let user = session.get_current_user()?;
    ui::write_greeting(out, &user)?;
    Ok(())
}

/// Menu loop. Returns on `0`, on end of input, or with the first error a
/// menu action reports.
pub fn run<S, R, W>(session: &mut S, mut input: R, out: &mut W) -> Result<()>
where
    S: MailSession,
    R: BufRead,
    W: Write,
{
    let mut line = Vec::new();
    loop {
        ui::write_menu(out)?;
        out.flush()?;

        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            log::debug!("input closed, leaving menu");
            return Ok(());
        }

        // undecodable bytes are just another invalid choice
        match std::str::from_utf8(&line).ok().and_then(Command::parse) {
            Some(cmd) => {
                if events::dispatch(cmd, session, out)? == Flow::Exit {
                    return Ok(());
                }
            }
            None => writeln!(out, "{}", ui::INVALID_CHOICE)?,
        }
    }
}
