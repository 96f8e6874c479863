use clap::Parser;

/// Interactive Arch Linux installer: btrfs subvolumes, systemd-boot and a
/// hardened base system. All settings are asked for interactively.
#[derive(Debug, Parser)]
#[clap(version, about)]
pub struct Cli {}

#[test]
fn test_cli_has_no_pipeline_flags() {
    use clap::CommandFactory;

    Cli::command().debug_assert();
    assert!(Cli::try_parse_from(["arch-provision"]).is_ok());
    assert!(Cli::try_parse_from(["arch-provision", "--dry-run"]).is_err());
    assert!(Cli::command().get_author().is_none());
}
