//! Command-line argument parsing and processing.
//!
//! Global flags (`--debug`, `--config <dir>`, `--help`, `--version`) may appear
//! anywhere. The first positional argument selects the command; without one the
//! reminder daemon runs in the foreground.

use crate::common::constants::{DEFAULT_ADHERENCE_DAYS, MAXIMUM_ADHERENCE_DAYS};

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the reminder daemon
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Today's doses with their status
    Status {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Adherence over the last `days` days
    Adherence {
        debug_enabled: bool,
        days: u32,
        config_dir: Option<String>,
    },
    List {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Add a medication from `key=value` fields
    Add {
        debug_enabled: bool,
        fields: Vec<(String, String)>,
        config_dir: Option<String>,
    },
    Edit {
        debug_enabled: bool,
        id: String,
        fields: Vec<(String, String)>,
        config_dir: Option<String>,
    },
    Remove {
        debug_enabled: bool,
        id: String,
        config_dir: Option<String>,
    },
    /// Take the active alarm's dose, or the dose of `medication_id`
    Take {
        debug_enabled: bool,
        medication_id: Option<String>,
        config_dir: Option<String>,
    },
    Snooze {
        debug_enabled: bool,
        minutes: Option<u32>,
    },
    Dismiss {
        debug_enabled: bool,
    },
    /// Ask the running daemon to re-read its configuration
    Reload {
        debug_enabled: bool,
    },
    /// Run the daemon against simulated time
    Simulate {
        debug_enabled: bool,
        start_time: String,
        end_time: String,
        multiplier: f64,
        log_to_file: bool,
        config_dir: Option<String>,
    },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    fn error() -> ParsedArgs {
        ParsedArgs {
            action: CliAction::ShowHelpDueToError,
        }
    }

    /// Parse command-line arguments (including the program name) into an action.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut config_dir: Option<String> = None;
        let mut log_to_file = false;
        let mut fast_forward = false;
        let mut days: Option<String> = None;
        let mut positional: Vec<String> = Vec::new();

        let mut i = 0;
        while i < args_vec.len() {
            let arg = args_vec[i].as_str();
            match arg {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--log" => log_to_file = true,
                "--fast-forward" | "-f" => fast_forward = true,
                "--config" | "-c" => {
                    match args_vec.get(i + 1).filter(|next| !next.starts_with('-')) {
                        Some(dir) => config_dir = Some(dir.clone()),
                        None => {
                            log_warning!(
                                "Missing directory for --config. Usage: --config <directory>"
                            );
                            return Self::error();
                        }
                    }
                    i += 1;
                }
                "--days" => {
                    match args_vec.get(i + 1) {
                        Some(value) => days = Some(value.clone()),
                        None => {
                            log_warning!("Missing value for --days. Usage: --days <n>");
                            return Self::error();
                        }
                    }
                    i += 1;
                }
                _ if arg.starts_with('-') && arg.len() > 1 => {
                    log_warning!("Unknown option: {}", arg);
                    return Self::error();
                }
                _ => positional.push(arg.to_string()),
            }
            i += 1;
        }

        if display_version {
            return ParsedArgs {
                action: CliAction::ShowVersion,
            };
        }
        if display_help {
            return ParsedArgs {
                action: CliAction::ShowHelp,
            };
        }

        let Some((command, rest)) = positional.split_first() else {
            return ParsedArgs {
                action: CliAction::Run {
                    debug_enabled,
                    config_dir,
                },
            };
        };

        if days.is_some() && command != "adherence" {
            log_warning!("--days only applies to the adherence command");
            return Self::error();
        }
        if (log_to_file || fast_forward) && command != "simulate" {
            log_warning!("--log and --fast-forward only apply to the simulate command");
            return Self::error();
        }

        let action = match command.as_str() {
            "run" => {
                if !rest.is_empty() {
                    return Self::unexpected(command, rest);
                }
                CliAction::Run {
                    debug_enabled,
                    config_dir,
                }
            }
            "status" | "st" => {
                if !rest.is_empty() {
                    return Self::unexpected(command, rest);
                }
                CliAction::Status {
                    debug_enabled,
                    config_dir,
                }
            }
            "adherence" | "stats" => {
                if !rest.is_empty() {
                    return Self::unexpected(command, rest);
                }
                let days = match days {
                    None => DEFAULT_ADHERENCE_DAYS,
                    Some(value) => match value.parse::<u32>() {
                        Ok(n) if (1..=MAXIMUM_ADHERENCE_DAYS).contains(&n) => n,
                        _ => {
                            log_warning!(
                                "Invalid --days value '{}'. Use a number from 1 to {}",
                                value,
                                MAXIMUM_ADHERENCE_DAYS
                            );
                            return Self::error();
                        }
                    },
                };
                CliAction::Adherence {
                    debug_enabled,
                    days,
                    config_dir,
                }
            }
            "list" | "ls" => {
                if !rest.is_empty() {
                    return Self::unexpected(command, rest);
                }
                CliAction::List {
                    debug_enabled,
                    config_dir,
                }
            }
            "add" => {
                let Some(fields) = parse_fields(rest) else {
                    log_warning!("Usage: dosewatch add name=<name> dosage=<dosage> time=<HH:MM> [field=value...]");
                    return Self::error();
                };
                CliAction::Add {
                    debug_enabled,
                    fields,
                    config_dir,
                }
            }
            "edit" => {
                let Some((id, field_args)) = rest.split_first() else {
                    log_warning!("Usage: dosewatch edit <id> field=value [field=value...]");
                    return Self::error();
                };
                let Some(fields) = parse_fields(field_args) else {
                    log_warning!("Usage: dosewatch edit <id> field=value [field=value...]");
                    return Self::error();
                };
                CliAction::Edit {
                    debug_enabled,
                    id: id.clone(),
                    fields,
                    config_dir,
                }
            }
            "remove" | "rm" => match rest {
                [id] => CliAction::Remove {
                    debug_enabled,
                    id: id.clone(),
                    config_dir,
                },
                _ => {
                    log_warning!("Usage: dosewatch remove <id>");
                    return Self::error();
                }
            },
            "take" => match rest {
                [] => CliAction::Take {
                    debug_enabled,
                    medication_id: None,
                    config_dir,
                },
                [id] => CliAction::Take {
                    debug_enabled,
                    medication_id: Some(id.clone()),
                    config_dir,
                },
                _ => return Self::unexpected(command, &rest[1..]),
            },
            "snooze" => match rest {
                [] => CliAction::Snooze {
                    debug_enabled,
                    minutes: None,
                },
                [minutes] => match minutes.parse::<u32>() {
                    Ok(minutes) => CliAction::Snooze {
                        debug_enabled,
                        minutes: Some(minutes),
                    },
                    Err(_) => {
                        log_warning!("Invalid snooze duration: {}", minutes);
                        return Self::error();
                    }
                },
                _ => return Self::unexpected(command, &rest[1..]),
            },
            "dismiss" => {
                if !rest.is_empty() {
                    return Self::unexpected(command, rest);
                }
                CliAction::Dismiss { debug_enabled }
            }
            "reload" | "r" => {
                if !rest.is_empty() {
                    return Self::unexpected(command, rest);
                }
                CliAction::Reload { debug_enabled }
            }
            "simulate" | "sim" => {
                let (start_time, end_time, multiplier) = match rest {
                    [start, end] => (start, end, 1.0),
                    [start, end, multiplier] => match multiplier.parse::<f64>() {
                        Ok(m) if m > 0.0 => (start, end, m),
                        _ => {
                            log_warning!("Invalid multiplier: {}", multiplier);
                            return Self::error();
                        }
                    },
                    _ => {
                        log_warning!(
                            "Usage: dosewatch simulate \"YYYY-MM-DD HH:MM\" \"YYYY-MM-DD HH:MM\" [multiplier] [--fast-forward] [--log]"
                        );
                        return Self::error();
                    }
                };
                CliAction::Simulate {
                    debug_enabled,
                    start_time: start_time.clone(),
                    end_time: end_time.clone(),
                    multiplier: if fast_forward { 0.0 } else { multiplier },
                    log_to_file,
                    config_dir,
                }
            }
            _ => {
                log_warning!("Unknown command: {}", command);
                return Self::error();
            }
        };

        ParsedArgs { action }
    }

    fn unexpected(command: &str, extra: &[String]) -> ParsedArgs {
        log_warning!(
            "Unexpected arguments for '{}': {}",
            command,
            extra.join(" ")
        );
        Self::error()
    }
}

/// Split `key=value` arguments. `None` when empty or when any argument lacks `=`.
fn parse_fields(args: &[String]) -> Option<Vec<(String, String)>> {
    if args.is_empty() {
        return None;
    }
    args.iter()
        .map(|arg| {
            let (key, value) = arg.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::logger::Log;

    fn parse(args: &[&str]) -> CliAction {
        Log::set_enabled(false);
        let mut full = vec!["dosewatch"];
        full.extend_from_slice(args);
        ParsedArgs::parse(full).action
    }

    #[test]
    fn test_parse_no_args() {
        assert_eq!(
            parse(&[]),
            CliAction::Run {
                debug_enabled: false,
                config_dir: None,
            }
        );
    }

    #[test]
    fn test_parse_debug_and_config_anywhere() {
        assert_eq!(
            parse(&["status", "-d", "--config", "/tmp/dw"]),
            CliAction::Status {
                debug_enabled: true,
                config_dir: Some("/tmp/dw".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_help_and_version_take_precedence() {
        assert_eq!(parse(&["list", "--help"]), CliAction::ShowHelp);
        assert_eq!(parse(&["-h"]), CliAction::ShowHelp);
        assert_eq!(parse(&["--version", "--help"]), CliAction::ShowVersion);
        assert_eq!(parse(&["-V"]), CliAction::ShowVersion);
    }

    #[test]
    fn test_parse_unknown_flag_and_command() {
        assert_eq!(parse(&["--frobnicate"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["frobnicate"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["--config"]), CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_adherence_days() {
        assert_eq!(
            parse(&["adherence"]),
            CliAction::Adherence {
                debug_enabled: false,
                days: DEFAULT_ADHERENCE_DAYS,
                config_dir: None,
            }
        );
        assert_eq!(
            parse(&["adherence", "--days", "30"]),
            CliAction::Adherence {
                debug_enabled: false,
                days: 30,
                config_dir: None,
            }
        );
        assert_eq!(
            parse(&["adherence", "--days", "0"]),
            CliAction::ShowHelpDueToError
        );
        assert_eq!(
            parse(&["status", "--days", "3"]),
            CliAction::ShowHelpDueToError
        );
    }

    #[test]
    fn test_parse_add_fields() {
        assert_eq!(
            parse(&["add", "name=Aspirin", "dosage=100 mg", "time=08:00"]),
            CliAction::Add {
                debug_enabled: false,
                fields: vec![
                    ("name".to_string(), "Aspirin".to_string()),
                    ("dosage".to_string(), "100 mg".to_string()),
                    ("time".to_string(), "08:00".to_string()),
                ],
                config_dir: None,
            }
        );
        assert_eq!(parse(&["add"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["add", "Aspirin"]), CliAction::ShowHelpDueToError);
        assert_eq!(parse(&["add", "=x"]), CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_edit_and_remove() {
        assert_eq!(
            parse(&["edit", "abc", "instructions="]),
            CliAction::Edit {
                debug_enabled: false,
                id: "abc".to_string(),
                fields: vec![("instructions".to_string(), String::new())],
                config_dir: None,
            }
        );
        assert_eq!(parse(&["edit", "abc"]), CliAction::ShowHelpDueToError);
        assert_eq!(
            parse(&["rm", "abc"]),
            CliAction::Remove {
                debug_enabled: false,
                id: "abc".to_string(),
                config_dir: None,
            }
        );
        assert_eq!(parse(&["remove"]), CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_alarm_actions() {
        assert_eq!(
            parse(&["take"]),
            CliAction::Take {
                debug_enabled: false,
                medication_id: None,
                config_dir: None,
            }
        );
        assert_eq!(
            parse(&["take", "abc"]),
            CliAction::Take {
                debug_enabled: false,
                medication_id: Some("abc".to_string()),
                config_dir: None,
            }
        );
        assert_eq!(
            parse(&["snooze", "15"]),
            CliAction::Snooze {
                debug_enabled: false,
                minutes: Some(15),
            }
        );
        assert_eq!(parse(&["snooze", "soon"]), CliAction::ShowHelpDueToError);
        assert_eq!(
            parse(&["dismiss"]),
            CliAction::Dismiss {
                debug_enabled: false
            }
        );
        assert_eq!(parse(&["dismiss", "now"]), CliAction::ShowHelpDueToError);
    }

    #[test]
    fn test_parse_simulate() {
        assert_eq!(
            parse(&[
                "simulate",
                "2025-06-10 08:00",
                "2025-06-10 12:00",
                "60",
                "--log"
            ]),
            CliAction::Simulate {
                debug_enabled: false,
                start_time: "2025-06-10 08:00".to_string(),
                end_time: "2025-06-10 12:00".to_string(),
                multiplier: 60.0,
                log_to_file: true,
                config_dir: None,
            }
        );
        assert_eq!(
            parse(&["simulate", "2025-06-10 08:00", "2025-06-10 12:00", "-f"]),
            CliAction::Simulate {
                debug_enabled: false,
                start_time: "2025-06-10 08:00".to_string(),
                end_time: "2025-06-10 12:00".to_string(),
                multiplier: 0.0,
                log_to_file: false,
                config_dir: None,
            }
        );
        assert_eq!(
            parse(&["simulate", "2025-06-10 08:00"]),
            CliAction::ShowHelpDueToError
        );
        assert_eq!(parse(&["status", "--log"]), CliAction::ShowHelpDueToError);
    }
}
