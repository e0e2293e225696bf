pub mod client;
pub mod logging;
pub mod server;

use clap::{
    ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("bookshelf")
        .about("Personal book tracking")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(server::command())
        .subcommands(client::commands());

    let command = client::with_global_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::server::Options;

    const SERVER_ENV: [(&str, Option<&str>); 8] = [
        ("BOOKSHELF_PORT", None),
        ("BOOKSHELF_DSN", None),
        ("BOOKSHELF_JWT_SECRET", None),
        ("BOOKSHELF_GOOGLE_CLIENT_ID", None),
        ("BOOKSHELF_GOOGLE_JWKS_URL", None),
        ("BOOKSHELF_LOCAL_TOKEN_TTL", None),
        ("BOOKSHELF_PROVIDER_TOKEN_TTL", None),
        ("BOOKSHELF_ALLOWED_ORIGIN", None),
    ];

    #[test]
    fn test_new() {
        let command = new();
        assert_eq!(command.get_name(), "bookshelf");
        assert_eq!(
            command.get_about().map(ToString::to_string).as_deref(),
            Some("Personal book tracking")
        );
        assert_eq!(
            command.get_version().map(ToString::to_string).as_deref(),
            Some(env!("CARGO_PKG_VERSION"))
        );
        command.debug_assert();
    }

    #[test]
    fn test_server_defaults() {
        temp_env::with_vars(SERVER_ENV, || {
            let matches = new().get_matches_from([
                "bookshelf",
                "server",
                "--dsn",
                "memory://",
                "--jwt-secret",
                "s3cr3t",
            ]);
            let server = matches
                .subcommand_matches("server")
                .expect("server subcommand");
            let options = Options::parse(server).expect("server options");
            assert_eq!(options.port, 3000);
            assert_eq!(options.dsn, "memory://");
            assert_eq!(options.local_token_ttl_seconds, 0);
            assert_eq!(options.provider_token_ttl_seconds, 86_400);
            assert_eq!(
                options.google_jwks_url,
                "https://www.googleapis.com/oauth2/v3/certs"
            );
            assert!(options.google_client_id.is_none());
            assert!(options.allowed_origin.is_none());
        });
    }

    #[test]
    fn test_server_from_env() {
        temp_env::with_vars(
            [
                ("BOOKSHELF_PORT", Some("8080")),
                ("BOOKSHELF_DSN", Some("postgres://localhost/bookshelf")),
                ("BOOKSHELF_JWT_SECRET", Some("s3cr3t")),
                ("BOOKSHELF_GOOGLE_CLIENT_ID", Some("client.apps.googleusercontent.com")),
                ("BOOKSHELF_GOOGLE_JWKS_URL", None),
                ("BOOKSHELF_LOCAL_TOKEN_TTL", Some("3600")),
                ("BOOKSHELF_PROVIDER_TOKEN_TTL", Some("60")),
                ("BOOKSHELF_ALLOWED_ORIGIN", Some("https://books.example.com")),
            ],
            || {
                let matches = new().get_matches_from(["bookshelf", "server"]);
                let server = matches
                    .subcommand_matches("server")
                    .expect("server subcommand");
                let options = Options::parse(server).expect("server options");
                assert_eq!(options.port, 8080);
                assert_eq!(options.dsn, "postgres://localhost/bookshelf");
                assert_eq!(
                    options.google_client_id.as_deref(),
                    Some("client.apps.googleusercontent.com")
                );
                assert_eq!(options.local_token_ttl_seconds, 3600);
                assert_eq!(options.provider_token_ttl_seconds, 60);
                assert_eq!(
                    options.allowed_origin.as_deref(),
                    Some("https://books.example.com")
                );
            },
        );
    }

    #[test]
    fn test_server_requires_secret() {
        temp_env::with_vars(SERVER_ENV, || {
            let result =
                new().try_get_matches_from(["bookshelf", "server", "--dsn", "memory://"]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_books_status_is_validated() {
        let result = new().try_get_matches_from([
            "bookshelf",
            "books",
            "list",
            "--status",
            "finished",
        ]);
        assert!(result.is_err());

        let result = new().try_get_matches_from(["bookshelf", "books", "cycle", "not-a-uuid"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subcommand_required() {
        assert!(new().try_get_matches_from(["bookshelf"]).is_err());
    }
}
