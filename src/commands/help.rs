//! Help and version output.

/// Brief usage line, shown after argument errors.
pub fn show_usage() {
    log_block_start!("Usage: dosewatch [OPTIONS] [COMMAND]");
    log_indented!("Run 'dosewatch --help' for the list of commands");
}

pub fn display_help() {
    log_version!();
    log_block_start!("Medication reminder daemon and dose tracker");
    log_block_start!("Usage: dosewatch [OPTIONS] [COMMAND]");

    log_block_start!("Commands:");
    log_indented!("run (default)                 Run the reminder daemon in the foreground");
    log_indented!("status, st                    Today's doses and the current alarm");
    log_indented!("adherence, stats [--days N]   Adherence over the last N days (default 7)");
    log_indented!("list, ls                      List all medications");
    log_indented!("add <field=value>...          Add a medication (name, dosage, time required)");
    log_indented!("edit <med> <field=value>...   Change a medication");
    log_indented!("remove, rm <med>              Remove a medication and its history");
    log_indented!("take [<med>]                  Take the ringing dose, or a specific one");
    log_indented!("snooze [minutes]              Snooze the ringing alarm");
    log_indented!("dismiss                       Silence the ringing alarm");
    log_indented!("reload, r                     Reload the daemon's configuration");
    log_indented!("simulate <start> <end> [x]    Run the daemon on simulated time");

    log_block_start!("Options:");
    log_indented!("-c, --config <dir>            Use a custom configuration directory");
    log_indented!("-d, --debug                   Show detailed diagnostic output");
    log_indented!("-f, --fast-forward            (simulate) Run as fast as possible");
    log_indented!("    --log                     (simulate) Write output to a log file");
    log_indented!("-h, --help                    Print help information");
    log_indented!("-V, --version                 Print version information");

    log_block_start!("Fields:");
    log_indented!("name, dosage, time (HH:MM), frequency, risk, status,");
    log_indented!("start (YYYY-MM-DD), end, instructions");
    log_indented!("<med> is a medication id, id prefix or name");
    log_end!();
}

pub fn display_version() {
    println!("dosewatch {}", env!("CARGO_PKG_VERSION"));
}
