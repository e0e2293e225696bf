use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;

use crate::client::Session;

pub const ARG_API_URL: &str = "api-url";
pub const ARG_SESSION_FILE: &str = "session-file";
pub const ARG_USERNAME: &str = "username";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_ASSERTION: &str = "assertion";
pub const ARG_TITLE: &str = "title";
pub const ARG_AUTHOR: &str = "author";
pub const ARG_STATUS: &str = "status";
pub const ARG_ID: &str = "id";

pub const DEFAULT_API_URL: &str = "http://localhost:3000";

const STATUSES: [&str; 3] = ["to-read", "reading", "read"];

#[derive(Debug, Clone)]
pub struct Options {
    pub api_url: String,
    pub session_file: PathBuf,
}

impl Options {
    /// Parse the global client arguments.
    ///
    /// # Errors
    /// Returns an error if no session file is given and `$HOME` is unknown.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let api_url = matches
            .get_one::<String>(ARG_API_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let session_file = match matches.get_one::<String>(ARG_SESSION_FILE) {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => Session::default_path().ok_or_else(|| {
                anyhow::anyhow!("cannot locate session file: set --{ARG_SESSION_FILE} or $HOME")
            })?,
        };
        Ok(Self {
            api_url,
            session_file,
        })
    }
}

#[must_use]
pub fn with_global_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the bookshelf API")
                .env("BOOKSHELF_API_URL")
                .default_value(DEFAULT_API_URL)
                .global(true),
        )
        .arg(
            Arg::new(ARG_SESSION_FILE)
                .long(ARG_SESSION_FILE)
                .help("File holding the session token (default: $HOME/.bookshelf/token)")
                .env("BOOKSHELF_SESSION_FILE")
                .global(true),
        )
}

fn credentials(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_USERNAME)
                .short('u')
                .long(ARG_USERNAME)
                .help("Username")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Password")
                .env("BOOKSHELF_PASSWORD")
                .hide_env_values(true)
                .required(true),
        )
}

fn status_arg() -> Arg {
    Arg::new(ARG_STATUS)
        .short('s')
        .long(ARG_STATUS)
        .value_parser(STATUSES)
}

fn id_arg() -> Arg {
    Arg::new(ARG_ID)
        .help("Book id")
        .required(true)
        .value_parser(clap::value_parser!(uuid::Uuid))
}

#[must_use]
pub fn commands() -> Vec<Command> {
    vec![
        credentials(Command::new("register").about("Create an account and sign in")),
        credentials(Command::new("login").about("Sign in with username and password")),
        Command::new("google")
            .about("Sign in with a Google ID token")
            .arg(
                Arg::new(ARG_ASSERTION)
                    .long(ARG_ASSERTION)
                    .help("Google-issued ID token")
                    .required(true),
            ),
        Command::new("logout").about("Forget the stored session"),
        Command::new("books")
            .about("Manage your books")
            .subcommand_required(true)
            .arg_required_else_help(true)
            .subcommand(
                Command::new("list")
                    .about("List books, optionally by status")
                    .arg(status_arg().help("Only show books with this status")),
            )
            .subcommand(
                Command::new("add")
                    .about("Add a book")
                    .arg(Arg::new(ARG_TITLE).long(ARG_TITLE).short('t').required(true))
                    .arg(Arg::new(ARG_AUTHOR).long(ARG_AUTHOR).short('a').required(true))
                    .arg(status_arg().help("Initial status (default: to-read)")),
            )
            .subcommand(
                Command::new("cycle")
                    .about("Advance a book to its next status")
                    .arg(id_arg()),
            )
            .subcommand(Command::new("delete").about("Delete a book").arg(id_arg())),
    ]
}
