//! Medication management commands: `list`, `add`, `edit`, `remove`.
//!
//! Fields are given as `key=value` pairs:
//!
//! | key                       | value                               |
//! |---------------------------|-------------------------------------|
//! | `name`                    | display name                        |
//! | `dosage`                  | free text, e.g. `100 mg`            |
//! | `time`, `scheduled_time`  | `HH:MM`                             |
//! | `frequency`               | once, twice, thrice, daily          |
//! | `risk`, `risk_level`      | low, medium, high                   |
//! | `status`                  | active, completed, paused           |
//! | `start`, `start_date`     | `YYYY-MM-DD`                        |
//! | `end`, `end_date`         | `YYYY-MM-DD`, empty clears (edit)   |
//! | `instructions`, `notes`   | free text, empty clears (edit)      |

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;

use crate::model::{
    Frequency, Medication, MedicationPatch, MedicationStatus, NewMedication, RiskLevel,
    ScheduledTime,
};
use crate::store::MedicationStore;

fn parse_time(value: &str) -> Result<ScheduledTime> {
    ScheduledTime::parse(value)
        .ok_or_else(|| anyhow!("Invalid time '{}'. Use HH:MM (24-hour)", value))
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid {} '{}'. Use YYYY-MM-DD", key, value))
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn required_text(key: &str, value: &str) -> Result<String> {
    optional_text(value).ok_or_else(|| anyhow!("{} must not be empty", key))
}

/// Build a new medication from `key=value` fields. `name`, `dosage` and
/// `time` are required; the start date defaults to `today`.
pub fn new_medication_from_fields(
    fields: &[(String, String)],
    today: NaiveDate,
) -> Result<NewMedication> {
    let patch = patch_from_fields(fields)?;

    let name = patch.name.context("Missing field: name")?;
    let dosage = patch.dosage.context("Missing field: dosage")?;
    let time = patch.scheduled_time.context("Missing field: time")?;

    let mut new = NewMedication::new(name, dosage, time, patch.start_date.unwrap_or(today));
    if let Some(frequency) = patch.frequency {
        new.frequency = frequency;
    }
    if let Some(risk_level) = patch.risk_level {
        new.risk_level = risk_level;
    }
    if let Some(status) = patch.status {
        new.status = status;
    }
    new.end_date = patch.end_date.flatten();
    new.instructions = patch.instructions.flatten();

    if let Some(end) = new.end_date
        && end < new.start_date
    {
        bail!("end_date ({end}) is before start_date ({})", new.start_date);
    }

    Ok(new)
}

/// Turn `key=value` fields into a partial update.
pub fn patch_from_fields(fields: &[(String, String)]) -> Result<MedicationPatch> {
    let mut patch = MedicationPatch::default();

    for (key, value) in fields {
        match key.as_str() {
            "name" => patch.name = Some(required_text(key, value)?),
            "dosage" => patch.dosage = Some(required_text(key, value)?),
            "time" | "scheduled_time" => patch.scheduled_time = Some(parse_time(value)?),
            "frequency" => {
                patch.frequency = Some(value.parse::<Frequency>().map_err(|e| anyhow!(e))?)
            }
            "risk" | "risk_level" => {
                patch.risk_level = Some(value.parse::<RiskLevel>().map_err(|e| anyhow!(e))?)
            }
            "status" => {
                patch.status = Some(value.parse::<MedicationStatus>().map_err(|e| anyhow!(e))?)
            }
            "start" | "start_date" => patch.start_date = Some(parse_date(key, value)?),
            "end" | "end_date" => {
                patch.end_date = Some(match optional_text(value) {
                    Some(date) => Some(parse_date(key, &date)?),
                    None => None,
                })
            }
            "instructions" | "notes" => patch.instructions = Some(optional_text(value)),
            other => bail!("Unknown field '{}'", other),
        }
    }

    Ok(patch)
}

/// Find a medication by full id, unique id prefix, or exact name
/// (case-insensitive).
pub fn resolve_medication_id(store: &dyn MedicationStore, query: &str) -> Result<String> {
    let medications = store.all();

    if let Some(found) = medications.iter().find(|m| m.id == query) {
        return Ok(found.id.clone());
    }

    let by_prefix: Vec<&Medication> = medications
        .iter()
        .filter(|m| m.id.starts_with(query))
        .collect();
    match by_prefix.as_slice() {
        [single] => return Ok(single.id.clone()),
        [] => {}
        _ => bail!("'{}' matches {} medications, use more of the id", query, by_prefix.len()),
    }

    let by_name: Vec<&Medication> = medications
        .iter()
        .filter(|m| m.name.eq_ignore_ascii_case(query))
        .collect();
    match by_name.as_slice() {
        [single] => Ok(single.id.clone()),
        [] => bail!("No medication matches '{}'", query),
        _ => bail!("Several medications are named '{}', use the id", query),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_medication(medication: &Medication) {
    println!(
        "{:<8}  {}  {:<20} {:<12} {:<8} {:<9} {}",
        short_id(&medication.id),
        medication.scheduled_time,
        medication.name,
        medication.dosage,
        medication.frequency,
        medication.status,
        medication.risk_level
    );
    if let Some(instructions) = &medication.instructions {
        println!("{:>17} {}", "", instructions);
    }
}

pub fn handle_list_command() -> Result<()> {
    let store = super::open_store()?;
    let mut medications = store.all();

    if medications.is_empty() {
        log_block_start!("No medications yet");
        log_indented!("Add one with: dosewatch add name=<name> dosage=<dosage> time=<HH:MM>");
        log_end!();
        return Ok(());
    }

    medications.sort_by(|a, b| a.scheduled_time.cmp(&b.scheduled_time));
    println!(
        "{:<8}  {:<5}  {:<20} {:<12} {:<8} {:<9} {}",
        "ID", "TIME", "NAME", "DOSAGE", "FREQ", "STATUS", "RISK"
    );
    for medication in &medications {
        print_medication(medication);
    }
    Ok(())
}

pub fn handle_add_command(fields: &[(String, String)]) -> Result<()> {
    let now = crate::time::source::now();
    let new = new_medication_from_fields(fields, now.date_naive())?;

    let mut store = super::open_store()?;
    let medication = store.add(new, now)?;

    log_block_start!(
        "Added {} ({}) at {}",
        medication.name,
        medication.dosage,
        medication.scheduled_time
    );
    log_indented!("ID: {}", medication.id);
    log_end!();
    Ok(())
}

pub fn handle_edit_command(query: &str, fields: &[(String, String)]) -> Result<()> {
    let patch = patch_from_fields(fields)?;
    if patch.is_empty() {
        bail!("Nothing to change");
    }

    let mut store = super::open_store()?;
    let id = resolve_medication_id(&store, query)?;
    let medication = store.update(&id, patch, crate::time::source::now())?;

    log_block_start!("Updated {}", medication.name);
    print_medication(&medication);
    log_end!();
    Ok(())
}

pub fn handle_remove_command(query: &str) -> Result<()> {
    let mut store = super::open_store()?;
    let id = resolve_medication_id(&store, query)?;
    let medication = store.remove(&id)?;

    log_block_start!("Removed {} and its dose history", medication.name);
    log_end!();
    Ok(())
}
