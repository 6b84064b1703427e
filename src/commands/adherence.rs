//! Adherence command: per-day taken/missed counts, overall rate and streak.

use anyhow::Result;

use crate::common::utils::pluralize;
use crate::core::adherence::{AdherenceReport, summarize_window};
use crate::model::DoseStatus;

/// One line per day, oldest first.
pub fn format_report(report: &AdherenceReport) -> Vec<String> {
    report
        .days
        .iter()
        .map(|day| {
            let taken = day.count(DoseStatus::Taken);
            let total = day.doses.len();
            let bar: String = day
                .doses
                .iter()
                .map(|d| match d.status {
                    DoseStatus::Taken => '█',
                    DoseStatus::Missed => '░',
                    DoseStatus::Upcoming => '·',
                })
                .collect();
            format!(
                "{}  {:>2}/{:<2} {:>4}  {}",
                day.day.format("%a %m-%d"),
                taken,
                total,
                super::format_percent(day.percent()),
                bar
            )
        })
        .collect()
}

pub fn handle_adherence_command(days: u32) -> Result<()> {
    let store = super::open_store()?;
    let report = summarize_window(&store, days, crate::time::source::now());

    println!("Adherence over the last {}", pluralize(days as usize, "day", "days"));
    for line in format_report(&report) {
        println!("{line}");
    }
    println!();
    println!(
        "Overall: {} ({} taken, {} missed)",
        super::format_percent(report.percent()),
        report.taken(),
        report.missed()
    );
    println!(
        "Current streak: {}",
        pluralize(report.streak(), "day", "days")
    );
    Ok(())
}
