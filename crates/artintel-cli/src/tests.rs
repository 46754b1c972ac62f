use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["artintel", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["artintel", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["artintel"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn import_requires_a_path() {
    assert!(Cli::try_parse_from(["artintel", "import"]).is_err());

    let cli = Cli::try_parse_from(["artintel", "import", "data/articles.csv"]).unwrap();
    match cli.command {
        Some(Commands::Import { path }) => assert_eq!(path, PathBuf::from("data/articles.csv")),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn embed_defaults() {
    let cli = Cli::try_parse_from(["artintel", "embed"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Embed {
            batch_size: 50,
            limit: None
        })
    ));
}

#[test]
fn embed_with_batch_size_and_limit() {
    let cli = Cli::try_parse_from(["artintel", "embed", "--batch-size", "25", "--limit", "200"])
        .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Embed {
            batch_size: 25,
            limit: Some(200)
        })
    ));
}

#[test]
fn embed_rejects_zero_batch_size() {
    assert!(Cli::try_parse_from(["artintel", "embed", "--batch-size", "0"]).is_err());
}

#[test]
fn similar_defaults_to_five_results() {
    let cli = Cli::try_parse_from(["artintel", "similar", "interest rates"]).unwrap();
    match cli.command {
        Some(Commands::Similar { query, k }) => {
            assert_eq!(query, "interest rates");
            assert_eq!(k, 5);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn report_csv_is_optional() {
    let cli = Cli::try_parse_from(["artintel", "report"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Report { csv: None })));

    let cli = Cli::try_parse_from(["artintel", "report", "--csv", "in.csv"]).unwrap();
    match cli.command {
        Some(Commands::Report { csv }) => assert_eq!(csv, Some(PathBuf::from("in.csv"))),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn ask_requires_confirmation_by_default() {
    let cli = Cli::try_parse_from(["artintel", "ask", "How many articles in 2024?"]).unwrap();
    match cli.command {
        Some(Commands::Ask {
            question,
            yes,
            max_rows,
        }) => {
            assert_eq!(question, "How many articles in 2024?");
            assert!(!yes);
            assert_eq!(max_rows, 200);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn ask_with_yes_flag() {
    let cli = Cli::try_parse_from(["artintel", "ask", "--yes", "Top issue?"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Ask { yes: true, .. })));
}

#[test]
fn parses_single_word_commands() {
    let parse = |arg: &str| {
        Cli::try_parse_from(["artintel", arg])
            .expect("expected valid cli args")
            .command
    };

    assert!(matches!(parse("status"), Some(Commands::Status)));
    assert!(matches!(parse("aggregate"), Some(Commands::Aggregate)));
    assert!(matches!(parse("summarise"), Some(Commands::Summarise)));
    assert!(matches!(parse("bootstrap"), Some(Commands::Bootstrap)));
}

#[test]
fn unknown_command_is_rejected() {
    assert!(Cli::try_parse_from(["artintel", "collect"]).is_err());
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}
