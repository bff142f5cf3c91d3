use super::normalizer::clean_display;
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug)]
pub(crate) struct SequenceRecord {
    pub(crate) line: u64,
    pub(crate) sequence: String,
    pub(crate) role: Option<String>,
    pub(crate) sender: Option<String>,
    pub(crate) counts: Result<RowCounts, String>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RowCounts {
    pub(crate) date: NaiveDate,
    pub(crate) sent: u32,
    pub(crate) opened: u32,
    pub(crate) clicked: u32,
    pub(crate) replied: u32,
    pub(crate) bounced: u32,
}

pub(crate) fn parse_records<R: Read>(reader: R) -> Result<Vec<SequenceRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut records = Vec::new();

    for record in csv_reader.records() {
        let record = record?;
        let line = record.position().map(|position| position.line()).unwrap_or(0);
        let row: SequenceRow = record.deserialize(Some(&headers))?;
        let counts = row.counts();

        records.push(SequenceRecord {
            line,
            sequence: clean_display(&row.sequence),
            role: row.role,
            sender: row.sender,
            counts,
        });
    }

    Ok(records)
}

#[derive(Debug, Deserialize)]
struct SequenceRow {
    #[serde(rename = "Sequence")]
    sequence: String,
    #[serde(rename = "Role", default, deserialize_with = "empty_string_as_none")]
    role: Option<String>,
    #[serde(rename = "Sender", default, deserialize_with = "empty_string_as_none")]
    sender: Option<String>,
    #[serde(rename = "Date", default, deserialize_with = "empty_string_as_none")]
    date: Option<String>,
    #[serde(rename = "Sent", default, deserialize_with = "empty_string_as_none")]
    sent: Option<String>,
    #[serde(rename = "Opened", default, deserialize_with = "empty_string_as_none")]
    opened: Option<String>,
    #[serde(rename = "Clicked", default, deserialize_with = "empty_string_as_none")]
    clicked: Option<String>,
    #[serde(rename = "Replied", default, deserialize_with = "empty_string_as_none")]
    replied: Option<String>,
    #[serde(rename = "Bounced", default, deserialize_with = "empty_string_as_none")]
    bounced: Option<String>,
}

impl SequenceRow {
    fn counts(&self) -> Result<RowCounts, String> {
        let date = match self.date.as_deref() {
            Some(raw) => parse_date(raw).ok_or_else(|| format!("unreadable date '{raw}'"))?,
            None => return Err("missing date".to_string()),
        };
        let sent = match self.sent.as_deref() {
            Some(raw) => parse_count("Sent", raw)?,
            None => return Err("missing sent count".to_string()),
        };

        Ok(RowCounts {
            date,
            sent,
            opened: optional_count("Opened", self.opened.as_deref())?,
            clicked: optional_count("Clicked", self.clicked.as_deref())?,
            replied: optional_count("Replied", self.replied.as_deref())?,
            bounced: optional_count("Bounced", self.bounced.as_deref())?,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn optional_count(column: &str, raw: Option<&str>) -> Result<u32, String> {
    raw.map_or(Ok(0), |raw| parse_count(column, raw))
}

fn parse_count(column: &str, raw: &str) -> Result<u32, String> {
    // exports render large numbers with thousands separators
    raw.trim()
        .replace(',', "")
        .parse::<u32>()
        .map_err(|_| format!("{column} is not a whole number: '{raw}'"))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc().date());
    }

    ["%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

#[cfg(test)]
pub(crate) fn parse_date_for_tests(value: &str) -> Option<NaiveDate> {
    parse_date(value)
}
