//! Tests for command line parsing

use clap::Parser;
use rstest::rstest;

use orgview::cli::args::{Cli, Commands, PoolCommands};

#[test]
fn given_move_with_before_when_parsing_then_sibling_drop() {
    let cli = Cli::try_parse_from(["orgview", "-dd", "move", "u1", "2", "--before"]).unwrap();

    assert_eq!(cli.debug, 2);
    match cli.command {
        Some(Commands::Move { id, target, before }) => {
            assert_eq!(id, "u1");
            assert_eq!(target, "2");
            assert!(before);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn given_role_without_value_when_parsing_then_role_cleared() {
    let cli = Cli::try_parse_from(["orgview", "role", "1"]).unwrap();

    assert!(matches!(
        cli.command,
        Some(Commands::Role { role: None, .. })
    ));
}

#[test]
fn given_pool_add_when_parsing_then_name_captured() {
    let cli = Cli::try_parse_from(["orgview", "pool", "add", "Ada Lovelace"]).unwrap();

    match cli.command {
        Some(Commands::Pool {
            command: PoolCommands::Add { name },
        }) => assert_eq!(name, "Ada Lovelace"),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[rstest]
#[case(&["orgview", "add", "root"])]
#[case(&["orgview", "rename", "1"])]
#[case(&["orgview", "move", "1"])]
#[case(&["orgview", "pool", "remove", "u1"])]
fn given_incomplete_arguments_when_parsing_then_rejected(#[case] args: &[&str]) {
    assert!(Cli::try_parse_from(args).is_err());
}
