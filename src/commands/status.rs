//! Status command: today's doses and the daemon's alarm state.

use anyhow::Result;

use crate::core::adherence::{DaySummary, summarize_today};
use crate::io::control::{ControlClient, ControlRequest};
use crate::model::DoseStatus;

fn marker(status: DoseStatus) -> &'static str {
    match status {
        DoseStatus::Taken => "✓",
        DoseStatus::Missed => "✗",
        DoseStatus::Upcoming => "·",
    }
}

/// Render today's summary as plain lines.
pub fn format_day(summary: &DaySummary) -> Vec<String> {
    let mut doses: Vec<_> = summary.doses.iter().collect();
    doses.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));

    let mut lines: Vec<String> = doses
        .iter()
        .map(|dose| {
            format!(
                "{} {}  {:<20} {:<12} {}",
                marker(dose.status),
                dose.scheduled_time,
                dose.name,
                dose.dosage,
                dose.status
            )
        })
        .collect();

    lines.push(format!(
        "Taken {}, missed {}, upcoming {} (adherence {})",
        summary.count(DoseStatus::Taken),
        summary.count(DoseStatus::Missed),
        summary.count(DoseStatus::Upcoming),
        super::format_percent(summary.percent())
    ));
    lines
}

pub fn handle_status_command() -> Result<()> {
    let store = super::open_store()?;
    let now = crate::time::source::now();
    let summary = summarize_today(&store, now);

    if summary.doses.is_empty() {
        println!("No doses scheduled for {}", summary.day);
    } else {
        println!("Doses for {}", summary.day);
        for line in format_day(&summary) {
            println!("{line}");
        }
    }

    let client = ControlClient::new();
    if !client.is_daemon_running() {
        println!();
        println!("dosewatch is not running, no alarms will ring");
        return Ok(());
    }

    let state = client.send(&ControlRequest::State)?;
    println!();
    match &state.active {
        Some(active) => println!(
            "Alarm ringing: {} (scheduled {}, since {})",
            active.medication_name,
            active.scheduled_time,
            active.fired_at.format("%H:%M")
        ),
        None => println!("No alarm ringing"),
    }
    for snooze in &state.snoozes {
        let name = summary
            .doses
            .iter()
            .find(|d| d.medication_id == snooze.medication_id)
            .map(|d| d.name.as_str())
            .unwrap_or(snooze.medication_id.as_str());
        println!("Snoozed: {} until {}", name, snooze.fire_at.format("%H:%M"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::adherence::DoseEntry;
    use chrono::NaiveDate;

    fn entry(name: &str, time: &str, status: DoseStatus) -> DoseEntry {
        DoseEntry {
            medication_id: name.to_lowercase(),
            name: name.to_string(),
            dosage: "1 tablet".to_string(),
            scheduled_time: time.to_string(),
            status,
        }
    }

    #[test]
    fn test_format_day_sorts_by_time_and_summarizes() {
        let summary = DaySummary {
            day: NaiveDate::from_ymd_opt(2025, 6, 10).unwrap(),
            doses: vec![
                entry("Evening", "20:00", DoseStatus::Upcoming),
                entry("Morning", "08:00", DoseStatus::Taken),
                entry("Noon", "12:00", DoseStatus::Missed),
            ],
        };

        let lines = format_day(&summary);
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("Morning"));
        assert!(lines[1].contains("Noon"));
        assert!(lines[2].contains("Evening"));
        assert_eq!(
            lines[3],
            "Taken 1, missed 1, upcoming 1 (adherence 50%)"
        );
    }
}
