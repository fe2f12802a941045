use anyhow::{Context, Result};
use std::io;
use std::process::ExitCode;

use graph_inbox::config::{load_dotenv, load_settings};
use graph_inbox::session::GraphSession;
use graph_inbox::terminal::{greet_user, run};

fn main() -> ExitCode {
    env_logger::init();

    match run_app() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_app() -> Result<()> {
    println!("Graph Inbox");
    println!();

    load_dotenv();
    let settings = load_settings().context("Error loading settings")?;

    let mut session = GraphSession::initialize_user_auth(&settings)
        .context("Error initializing Graph for user auth")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    greet_user(&mut session, &mut out).context("Error getting user")?;

    let stdin = io::stdin();
    run(&mut session, stdin.lock(), &mut out).context("Error running menu action")?;
    Ok(())
}
