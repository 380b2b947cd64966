//! Integration tests for CLI argument handling
//!
//! Invalid arguments must be rejected before the terminal UI starts.

use std::process::Command;

/// Helper to run the CLI with given args and capture output
fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_scoreline"))
        .args(args)
        .output()
        .expect("Failed to execute scoreline")
}

#[test]
fn test_help_flag_exits_successfully() {
    let output = run_cli(&["--help"]);
    assert!(
        output.status.success(),
        "Expected --help to exit successfully"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("scoreline"), "Help should mention scoreline");
    assert!(stdout.contains("--sport"), "Help should mention --sport flag");
    assert!(stdout.contains("--poll-ms"), "Help should mention --poll-ms flag");
    assert!(stdout.contains("--game-poll-ms"), "Help should mention --game-poll-ms flag");
}

#[test]
fn test_invalid_sport_prints_error_and_exits() {
    let output = run_cli(&["--sport", "curling"]);
    assert!(!output.status.success(), "Expected invalid sport to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid sport"),
        "Should print error message about invalid sport: {}",
        stderr
    );
}

#[test]
fn test_invalid_filter_prints_error_and_exits() {
    let output = run_cli(&["--filter", "tomorrow"]);
    assert!(!output.status.success(), "Expected invalid filter to fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Invalid filter"),
        "Should print error message about invalid filter: {}",
        stderr
    );
}

#[test]
fn test_inverted_ttls_are_rejected() {
    let output = run_cli(&["--live-ttl", "600", "--static-ttl", "60"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("TTL"), "Should explain the TTL problem: {}", stderr);
}

#[test]
fn test_sport_with_help_is_valid() {
    // With --help, it should succeed regardless of other flags
    let output = run_cli(&["--sport", "nba", "--help"]);
    assert!(output.status.success());
}

#[cfg(test)]
mod unit_tests {
    //! Unit tests for CLI parsing that don't require running the binary

    use std::time::Duration;

    use clap::Parser;
    use scoreline::cli::{parse_sport_arg, Cli, StartupConfig};
    use scoreline::data::{DateFilter, Sport};

    #[test]
    fn test_cli_no_args_uses_defaults() {
        let cli = Cli::parse_from(["scoreline"]);
        assert_eq!(cli.sport, "nfl");
        assert_eq!(cli.filter, "today");
        assert_eq!(cli.timeout, 12);
    }

    #[test]
    fn test_parse_sport_arg_premier_league() {
        assert_eq!(parse_sport_arg("premier-league").unwrap(), Sport::PremierLeague);
    }

    #[test]
    fn test_startup_config_from_cli_yesterday() {
        let cli = Cli::parse_from(["scoreline", "--filter", "yesterday", "--sport", "mlb"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.sport, Sport::Mlb);
        assert_eq!(config.filter, DateFilter::Yesterday);
    }

    #[test]
    fn test_startup_config_timeout() {
        let cli = Cli::parse_from(["scoreline", "--timeout", "3"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert_eq!(config.controller.fetch_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_startup_config_no_preload() {
        let cli = Cli::parse_from(["scoreline", "--no-preload"]);
        let config = StartupConfig::from_cli(&cli).unwrap();
        assert!(config.controller.preload_delay.is_none());
    }
}
