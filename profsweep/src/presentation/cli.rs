use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "profsweep: remove user profiles from remote Windows machines", long_about = None)]
pub struct Cli {
    /// TOML settings file (defaults apply when omitted)
    #[arg(long, global = true, env = "PROFSWEEP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the profiles on a computer, optionally running checks
    Scan {
        computer: String,

        /// measure each profile directory
        #[arg(long)]
        size: bool,

        /// probe whether each profile is in use
        #[arg(long)]
        state: bool,

        /// resolve SID and GUID from the registry
        #[arg(long)]
        registry: bool,
    },

    /// Delete profile directories and their registry keys
    Delete {
        computer: String,

        /// profile to delete (repeatable); all others are left alone
        #[arg(
            long = "user",
            value_name = "USER",
            required_unless_present = "all_marked",
            conflicts_with = "all_marked"
        )]
        users: Vec<String>,

        /// delete every profile not in use, except Public
        #[arg(long)]
        all_marked: bool,

        /// do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Check that a computer answers
    Ping { computer: String },

    /// Print the entries of a local registry export file
    Parse { file: PathBuf },

    /// Correlate two local exports for the given account names
    Resolve {
        profile_list: PathBuf,
        profile_guid: PathBuf,
        #[arg(required = true)]
        users: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_flags() {
        let cli =
            Cli::try_parse_from(["profsweep", "scan", "pc01", "--size", "--registry"]).unwrap();
        match cli.command {
            Commands::Scan {
                computer,
                size,
                state,
                registry,
            } => {
                assert_eq!(computer, "pc01");
                assert!(size && registry && !state);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(cli.config.is_none());
    }

    #[test]
    fn delete_takes_repeated_users() {
        let cli = Cli::try_parse_from([
            "profsweep", "delete", "pc01", "--user", "alice", "--user", "bob", "-y",
        ])
        .unwrap();
        match cli.command {
            Commands::Delete {
                users,
                all_marked,
                yes,
                ..
            } => {
                assert_eq!(users, vec!["alice", "bob"]);
                assert!(!all_marked);
                assert!(yes);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn delete_needs_a_selection() {
        assert!(Cli::try_parse_from(["profsweep", "delete", "pc01"]).is_err());
        assert!(
            Cli::try_parse_from(["profsweep", "delete", "pc01", "--user", "a", "--all-marked"])
                .is_err()
        );
        assert!(Cli::try_parse_from(["profsweep", "delete", "pc01", "--all-marked"]).is_ok());
    }

    #[test]
    fn config_is_global() {
        let cli =
            Cli::try_parse_from(["profsweep", "ping", "pc01", "--config", "site.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("site.toml")));
    }

    #[test]
    fn resolve_needs_users() {
        assert!(Cli::try_parse_from(["profsweep", "resolve", "a.reg", "b.reg"]).is_err());
        assert!(Cli::try_parse_from(["profsweep", "resolve", "a.reg", "b.reg", "alice"]).is_ok());
    }
}
