//! Maps parsed command-line matches to an [`Action`].

use crate::{
    cli::{
        actions::{Action, client, server},
        commands::{
            self,
            client::{
                ARG_ASSERTION, ARG_AUTHOR, ARG_ID, ARG_PASSWORD, ARG_STATUS, ARG_TITLE,
                ARG_USERNAME,
            },
        },
    },
    client::{Event, Filter, Panel},
    store::BookStatus,
};
use anyhow::{Context, Result, anyhow};
use clap::ArgMatches;
use uuid::Uuid;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("server", sub_m)) => {
            let options = commands::server::Options::parse(sub_m)?;
            Ok(Action::Server(server::Args {
                port: options.port,
                dsn: options.dsn,
                jwt_secret: options.jwt_secret,
                google_client_id: options.google_client_id,
                google_jwks_url: options.google_jwks_url,
                local_token_ttl_seconds: options.local_token_ttl_seconds,
                provider_token_ttl_seconds: options.provider_token_ttl_seconds,
                allowed_origin: options.allowed_origin,
            }))
        }
        Some((name, sub_m)) => {
            let options = commands::client::Options::parse(matches)?;
            let (load, events) = client_events(name, sub_m)?;
            Ok(Action::Client(client::Args {
                api_url: options.api_url,
                session_file: options.session_file,
                load,
                events,
            }))
        }
        None => Err(anyhow!("missing subcommand")),
    }
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

fn status(matches: &ArgMatches) -> Result<Option<BookStatus>> {
    matches
        .get_one::<String>(ARG_STATUS)
        .map(|value| value.parse::<BookStatus>())
        .transpose()
        .map_err(|err| anyhow!(err))
}

fn book_id(matches: &ArgMatches) -> Result<Uuid> {
    matches
        .get_one::<Uuid>(ARG_ID)
        .copied()
        .context("missing required argument: <id>")
}

/// Events for a client subcommand, and whether the book list must be loaded first.
fn client_events(name: &str, matches: &ArgMatches) -> Result<(bool, Vec<Event>)> {
    let events = match name {
        "register" => vec![
            Event::SwitchPanel(Panel::Register),
            Event::Register {
                username: required(matches, ARG_USERNAME)?,
                password: required(matches, ARG_PASSWORD)?,
            },
        ],
        "login" => vec![Event::Login {
            username: required(matches, ARG_USERNAME)?,
            password: required(matches, ARG_PASSWORD)?,
        }],
        "google" => vec![Event::ProviderLogin {
            assertion: required(matches, ARG_ASSERTION)?,
        }],
        "logout" => vec![Event::Logout],
        "books" => return books_events(matches),
        other => return Err(anyhow!("unknown command: {other}")),
    };
    Ok((false, events))
}

fn books_events(matches: &ArgMatches) -> Result<(bool, Vec<Event>)> {
    match matches.subcommand() {
        Some(("list", sub_m)) => {
            let filter = status(sub_m)?.map_or(Filter::All, Filter::Only);
            Ok((false, vec![Event::SetFilter(filter)]))
        }
        Some(("add", sub_m)) => Ok((
            false,
            vec![Event::AddBook {
                title: required(sub_m, ARG_TITLE)?,
                author: required(sub_m, ARG_AUTHOR)?,
                status: status(sub_m)?,
            }],
        )),
        // Cycling needs the current status, so the list is loaded first.
        Some(("cycle", sub_m)) => Ok((true, vec![Event::CycleStatus { id: book_id(sub_m)? }])),
        Some(("delete", sub_m)) => Ok((false, vec![Event::DeleteBook { id: book_id(sub_m)? }])),
        _ => Err(anyhow!("missing books subcommand")),
    }
}
