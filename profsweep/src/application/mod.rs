pub mod handlers;
pub mod logging;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use profsweep_core::Settings;
use profsweep_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    let _log_guard = logging::init(&settings.session_root)?;

    match cli.command {
        Commands::Scan {
            computer,
            size,
            state,
            registry,
        } => handlers::handle_scan(settings, computer, size, state, registry),
        Commands::Delete {
            computer,
            users,
            all_marked,
            yes,
        } => handlers::handle_delete(settings, computer, users, all_marked, yes),
        Commands::Ping { computer } => handlers::handle_ping(settings, computer),
        Commands::Parse { file } => handlers::handle_parse(file),
        Commands::Resolve {
            profile_list,
            profile_guid,
            users,
        } => handlers::handle_resolve(settings, profile_list, profile_guid, users),
    }
}
