use super::*;
use crate::score::GranularityArg;
use fairscore_core::Granularity;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["fairscore", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["fairscore", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["fairscore"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn accounts_sync_path_is_optional() {
    let cli = Cli::try_parse_from(["fairscore", "accounts", "sync"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Accounts {
            command: AccountsCommands::Sync { path: None }
        })
    ));
}

#[test]
fn accounts_add_collects_repeated_categories() {
    let cli = Cli::try_parse_from([
        "fairscore",
        "accounts",
        "add",
        "--platform",
        "instagram",
        "--username",
        "@GlowLab",
        "--category",
        "beauty",
        "--category",
        "skincare",
        "--client-account",
        "acme",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Accounts {
            command:
                AccountsCommands::Add {
                    platform,
                    username,
                    categories,
                    client_accounts,
                },
        }) => {
            assert_eq!(platform, Platform::Instagram);
            assert_eq!(username, "@GlowLab");
            assert_eq!(categories, vec!["beauty", "skincare"]);
            assert_eq!(client_accounts, vec!["acme"]);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn accounts_add_requires_a_category() {
    let result = Cli::try_parse_from([
        "fairscore",
        "accounts",
        "add",
        "--platform",
        "tiktok",
        "--username",
        "glowlab",
    ]);
    assert!(result.is_err());
}

#[test]
fn accounts_list_rejects_unknown_platform() {
    let result = Cli::try_parse_from(["fairscore", "accounts", "list", "--platform", "myspace"]);
    assert!(result.is_err());
}

#[test]
fn parses_ingest_dry_run() {
    let cli = Cli::try_parse_from([
        "fairscore",
        "ingest",
        "--start",
        "2025-01-01",
        "--end",
        "2025-01-31",
        "--platform",
        "tiktok",
        "--dry-run",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Ingest {
            start,
            end,
            category,
            platform,
            dry_run,
        }) => {
            assert_eq!(start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
            assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
            assert!(category.is_none());
            assert_eq!(platform, Some(Platform::TikTok));
            assert!(dry_run);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn ingest_rejects_malformed_dates() {
    let result = Cli::try_parse_from([
        "fairscore",
        "ingest",
        "--start",
        "2025-13-01",
        "--end",
        "2025-01-31",
    ]);
    assert!(result.is_err());
}

#[test]
fn parses_responsiveness_backfill() {
    let cli = Cli::try_parse_from([
        "fairscore",
        "responsiveness",
        "backfill",
        "--category",
        "beauty",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Some(Commands::Responsiveness {
            command: ResponsivenessCommands::Backfill { since: None, .. }
        })
    ));
}

#[test]
fn score_run_defaults_to_all_granularities() {
    let cli = Cli::try_parse_from([
        "fairscore",
        "score",
        "run",
        "--start",
        "2025-01-01",
        "--end",
        "2025-01-15",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Some(Commands::Score {
            command: ScoreCommands::Run {
                granularity: GranularityArg::All,
                skip_backfill: false,
                category: None,
                platform: None,
                ..
            }
        })
    ));
}

#[test]
fn score_run_accepts_single_pass_and_skip_backfill() {
    let cli = Cli::try_parse_from([
        "fairscore",
        "score",
        "run",
        "--start",
        "2025-01-01",
        "--end",
        "2025-01-15",
        "--granularity",
        "daily",
        "--skip-backfill",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Some(Commands::Score {
            command: ScoreCommands::Run {
                granularity: GranularityArg::Daily,
                skip_backfill: true,
                ..
            }
        })
    ));
}

#[test]
fn score_adhoc_requires_category_and_platform() {
    let result = Cli::try_parse_from([
        "fairscore",
        "score",
        "adhoc",
        "--start",
        "2025-01-01",
        "--end",
        "2025-01-31",
    ]);
    assert!(result.is_err());

    let cli = Cli::try_parse_from([
        "fairscore",
        "score",
        "adhoc",
        "--start",
        "2025-01-01",
        "--end",
        "2025-01-31",
        "--category",
        "beauty",
        "--platform",
        "ig",
        "--json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Score {
            command: ScoreCommands::Adhoc {
                platform: Platform::Instagram,
                json: true,
                ..
            }
        })
    ));
}

#[test]
fn parses_score_ranking_with_username() {
    let cli = Cli::try_parse_from([
        "fairscore",
        "score",
        "ranking",
        "--granularity",
        "monthly",
        "--category",
        "beauty",
        "--platform",
        "instagram",
        "--start",
        "2025-01-01",
        "--end",
        "2025-01-31",
        "--username",
        "glowlab",
    ])
    .unwrap();

    match cli.command {
        Some(Commands::Score {
            command:
                ScoreCommands::Ranking {
                    granularity,
                    username,
                    ..
                },
        }) => {
            assert_eq!(granularity, Granularity::Monthly);
            assert_eq!(username.as_deref(), Some("glowlab"));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}
