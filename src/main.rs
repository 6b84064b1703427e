//! Command-line dispatch for dosewatch.
//!
//! Parses arguments, applies the global `--config` directory and hands off to
//! the daemon runner or a one-shot command from the library.

use anyhow::Result;

use dosewatch::Dosewatch;
use dosewatch::args::{CliAction, ParsedArgs};
use dosewatch::commands;
use dosewatch::common::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use dosewatch::config;
use dosewatch::{log_end, log_error_exit, log_indented};

fn run(action: CliAction) -> Result<()> {
    match action {
        CliAction::Run {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            Dosewatch::new(debug_enabled).run()
        }
        CliAction::Status { config_dir, .. } => {
            config::set_config_dir(config_dir)?;
            commands::status::handle_status_command()
        }
        CliAction::Adherence {
            days, config_dir, ..
        } => {
            config::set_config_dir(config_dir)?;
            commands::adherence::handle_adherence_command(days)
        }
        CliAction::List { config_dir, .. } => {
            config::set_config_dir(config_dir)?;
            commands::medication::handle_list_command()
        }
        CliAction::Add {
            fields, config_dir, ..
        } => {
            config::set_config_dir(config_dir)?;
            commands::medication::handle_add_command(&fields)
        }
        CliAction::Edit {
            id,
            fields,
            config_dir,
            ..
        } => {
            config::set_config_dir(config_dir)?;
            commands::medication::handle_edit_command(&id, &fields)
        }
        CliAction::Remove { id, config_dir, .. } => {
            config::set_config_dir(config_dir)?;
            commands::medication::handle_remove_command(&id)
        }
        CliAction::Take {
            medication_id,
            config_dir,
            ..
        } => {
            config::set_config_dir(config_dir)?;
            commands::action::handle_take_command(medication_id.as_deref())
        }
        CliAction::Snooze { minutes, .. } => commands::action::handle_snooze_command(minutes),
        CliAction::Dismiss { .. } => commands::action::handle_dismiss_command(),
        CliAction::Reload { debug_enabled } => {
            commands::reload::handle_reload_command(debug_enabled)
        }
        CliAction::Simulate {
            debug_enabled,
            start_time,
            end_time,
            multiplier,
            log_to_file,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            let _log_guard = commands::simulate::handle_simulate_command(
                &start_time,
                &end_time,
                multiplier,
                log_to_file,
                debug_enabled,
            )?;
            Dosewatch::new(debug_enabled)
                .without_lock()
                .without_headers()
                .run()
        }
        CliAction::ShowHelp => {
            commands::help::display_help();
            Ok(())
        }
        CliAction::ShowVersion => {
            commands::help::display_version();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            commands::help::show_usage();
            log_end!();
            std::process::exit(EXIT_FAILURE);
        }
    }
}

fn main() {
    let parsed = ParsedArgs::parse(std::env::args());

    let code = match run(parsed.action) {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            log_error_exit!("{e}");
            for cause in e.chain().skip(1) {
                log_indented!("{cause}");
            }
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}
