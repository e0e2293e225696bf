use crate::client::{ApiClient, ClientApp, Event, Session};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub api_url: String,
    pub session_file: PathBuf,
    /// Fetch the book list before applying `events`.
    pub load: bool,
    pub events: Vec<Event>,
}

/// Run client events against the API and print the resulting view.
/// # Errors
/// Returns an error if the session file cannot be read or any event fails.
pub async fn execute(args: Args) -> Result<()> {
    let api = ApiClient::new(&args.api_url)
        .with_context(|| format!("Invalid API URL: {}", args.api_url))?;
    let session = Session::load(&args.session_file).with_context(|| {
        format!(
            "Failed to read session file: {}",
            args.session_file.display()
        )
    })?;

    let mut app = ClientApp::new(api, session);
    if args.load {
        app.load().await?;
    } else {
        app.restore()?;
    }

    for event in args.events {
        debug!(?event, "Applying client event");
        app.dispatch(event).await?;
    }

    print!("{}", app.render());
    Ok(())
}
