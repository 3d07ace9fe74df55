use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AlertError, Result};
use crate::message::Message;

pub const ORIGINATOR_WIDTH: usize = 3;
pub const EVENT_CODE_WIDTH: usize = 3;
pub const FIPS_WIDTH: usize = 6;

/// SAME messages carry no calendar year, only day-of-year + HHMM UTC. A
/// receiver resolves this against its own wall clock; for the purposes of
/// this library (which never reads the wall clock itself) callers pick the
/// year. Test fixtures and the default below share one reference year so
/// that day-of-year arithmetic is reproducible without a clock dependency.
pub const DEFAULT_REFERENCE_YEAR: i32 = 2023;

/// Valid SAME originator codes (wire grammar, §6).
pub fn originator_codes() -> &'static [&'static str] {
    &["EAS", "CIV", "WXR", "PEP"]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCategory {
    Warning,
    Watch,
    Advisory,
    Test,
    Unknown,
}

/// Known SAME event codes mapped to their priority category. This is not
/// the full NWS table — it covers the codes this crate's scoring function
/// needs to classify, per spec.md §4.4's taxonomy.
fn classify_event_code(code: &str) -> EventCategory {
    match code {
        "TOR" | "SVR" | "FFW" | "FLW" | "HUW" | "TSW" | "WSW" | "BZW" | "EWW" | "CFW" => {
            EventCategory::Warning
        }
        "SVA" | "TOA" | "FFA" | "FLA" | "HUA" => EventCategory::Watch,
        "FLS" | "CFA" | "SPS" => EventCategory::Advisory,
        "RWT" | "RMT" | "DMO" | "NPT" => EventCategory::Test,
        _ => EventCategory::Unknown,
    }
}

/// A fully decoded SAME header, parsed from the grammar in spec.md §6:
/// `-ORG-EEE-PSSFFF[-PSSFFF]*+TTTT-JJJHHMM-LLLLLLLL[-]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SameMessage {
    pub originator: String,
    pub event_code: String,
    pub fips_list: Vec<String>,
    pub purge_minutes: u32,
    pub issue_day_of_year: u32,
    pub issue_hhmm: u32,
    pub station: String,
    pub reference_year: i32,
    start_time_sec: i64,
    end_time_sec: i64,
}

impl SameMessage {
    /// Parse a SAME header body (without the `ZCZC` preamble, as delivered
    /// by the confidence averager). `reference_year` resolves the
    /// day-of-year into an absolute timestamp.
    pub fn parse(header: &str, reference_year: i32) -> Result<Self> {
        Self::parse_inner(header, reference_year).map_err(|e| {
            warn!(header, error = %e, "malformed SAME header");
            e
        })
    }

    fn parse_inner(header: &str, reference_year: i32) -> Result<Self> {
        let body = header.trim_end_matches('-');
        let fields: Vec<&str> = body.split('-').filter(|s| !s.is_empty()).collect();
        // fields: [ORG, EEE, FIPS..., "TTTT+JJJHHMM+STATION" is wrong split —
        // the '+' lives inside one of the hyphen-delimited fields, so the
        // purge/issue/station tail is the last field before we split on '+'.
        if fields.len() < 3 {
            return Err(AlertError::Decode {
                position: 0,
                reason: "too few hyphen-delimited fields".into(),
            });
        }
        let originator = fields[0].to_string();
        if originator.len() != ORIGINATOR_WIDTH {
            return Err(AlertError::Decode {
                position: 1,
                reason: format!("originator '{originator}' is not {ORIGINATOR_WIDTH} chars"),
            });
        }
        let event_code = fields[1].to_string();
        if event_code.len() != EVENT_CODE_WIDTH {
            return Err(AlertError::Decode {
                position: 5,
                reason: format!("event code '{event_code}' is not {EVENT_CODE_WIDTH} chars"),
            });
        }

        // Everything from field index 2 onward may contain FIPS codes, with
        // the final FIPS field smuggling in "+TTTT" before the next hyphen.
        let mut fips_list = Vec::new();
        let mut tail: Option<&str> = None;
        for (i, f) in fields.iter().enumerate().skip(2) {
            if let Some(plus_pos) = f.find('+') {
                let (fips, rest) = f.split_at(plus_pos);
                if !fips.is_empty() {
                    fips_list.push(fips.to_string());
                }
                tail = Some(rest); // includes leading '+'
                // Remaining fields (issue time, station) are re-joined below.
                let remainder = &fields[i + 1..];
                let rest_joined = if remainder.is_empty() {
                    String::new()
                } else {
                    format!("-{}", remainder.join("-"))
                };
                let full_tail = format!("{}{}", tail.unwrap(), rest_joined);
                return Self::finish_parse(originator, event_code, fips_list, &full_tail, reference_year);
            } else {
                fips_list.push(f.to_string());
            }
        }

        Err(AlertError::Decode {
            position: 0,
            reason: "purge offset '+TTTT' not found".into(),
        })
    }

    fn finish_parse(
        originator: String,
        event_code: String,
        fips_list: Vec<String>,
        tail: &str,
        reference_year: i32,
    ) -> Result<Self> {
        if fips_list.is_empty() {
            return Err(AlertError::Decode {
                position: 8,
                reason: "FIPS area list is empty".into(),
            });
        }
        let mut unique = fips_list.clone();
        unique.sort();
        unique.dedup();
        if unique.len() != fips_list.len() {
            return Err(AlertError::Decode {
                position: 8,
                reason: "FIPS area list contains duplicates".into(),
            });
        }

        // tail is "+TTTT-JJJHHMM-STATION[-]"
        let tail = tail.trim_start_matches('+');
        let mut tail_fields = tail.splitn(3, '-');
        let purge_str = tail_fields.next().unwrap_or_default();
        let issue_str = tail_fields.next().unwrap_or_default();
        let station = tail_fields.next().unwrap_or_default().trim_end_matches('-').to_string();

        if purge_str.len() != 4 || !purge_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(AlertError::Decode {
                position: 0,
                reason: format!("purge field '{purge_str}' is not 4 digits"),
            });
        }
        let purge_hours: u32 = purge_str[0..2].parse().unwrap_or(0);
        let purge_mins: u32 = purge_str[2..4].parse().unwrap_or(0);
        let purge_minutes = purge_hours * 60 + purge_mins;

        if issue_str.len() != 7 || !issue_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(AlertError::Decode {
                position: 0,
                reason: format!("issue time field '{issue_str}' is not 7 digits"),
            });
        }
        let issue_day_of_year: u32 = issue_str[0..3].parse().unwrap_or(0);
        let issue_hhmm: u32 = issue_str[3..7].parse().unwrap_or(0);

        if station.is_empty() {
            return Err(AlertError::Decode {
                position: 0,
                reason: "station id is empty".into(),
            });
        }

        let start_time_sec = day_of_year_hhmm_to_epoch(reference_year, issue_day_of_year, issue_hhmm)?;
        let end_time_sec = start_time_sec + (purge_minutes as i64) * 60;
        if end_time_sec <= start_time_sec {
            return Err(AlertError::Decode {
                position: 0,
                reason: "end time does not follow start time".into(),
            });
        }

        Ok(SameMessage {
            originator,
            event_code,
            fips_list,
            purge_minutes,
            issue_day_of_year,
            issue_hhmm,
            station,
            reference_year,
            start_time_sec,
            end_time_sec,
        })
    }

    pub fn category(&self) -> EventCategory {
        classify_event_code(&self.event_code)
    }

    /// A content-derived identity: two updates of the same event share this
    /// string. SAME carries no explicit tracking number, so identity is
    /// synthesized from office + event code + issue time + purge, matching
    /// spec.md §3.
    pub fn event_id_string(&self) -> String {
        format!(
            "{}-{}-{:03}{:04}+{:04}-{}",
            self.originator,
            self.event_code,
            self.issue_day_of_year,
            self.issue_hhmm,
            (self.purge_minutes / 60) * 100 + (self.purge_minutes % 60),
            self.station
        )
    }
}

impl Message for SameMessage {
    fn event_id(&self) -> String {
        self.event_id_string()
    }

    fn start_time_sec(&self) -> i64 {
        self.start_time_sec
    }

    fn end_time_sec(&self) -> i64 {
        self.end_time_sec
    }

    fn fips_list(&self) -> &[String] {
        &self.fips_list
    }

    fn polygon(&self) -> Option<&crate::location::Polygon> {
        None
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn category(&self) -> EventCategory {
        SameMessage::category(self)
    }

    fn published_time_sec(&self) -> i64 {
        self.start_time_sec
    }

    fn code(&self) -> String {
        self.event_code.clone()
    }
}

fn day_of_year_hhmm_to_epoch(year: i32, day_of_year: u32, hhmm: u32) -> Result<i64> {
    let date = NaiveDate::from_yo_opt(year, day_of_year).ok_or_else(|| AlertError::Decode {
        position: 0,
        reason: format!("day-of-year {day_of_year} is invalid for year {year}"),
    })?;
    let hour = hhmm / 100;
    let minute = hhmm % 100;
    let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| AlertError::Decode {
        position: 0,
        reason: format!("issue time {hhmm:04} is not a valid HHMM"),
    })?;
    let dt = NaiveDateTime::new(date, time);
    debug_assert_eq!(dt.year(), year);
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_rwt_header() {
        let header = "-WXR-RWT-020103-020209-020091-020121-029047-029165-029095-029037+0030-3031700-KEAX/NWS";
        let msg = SameMessage::parse(header, 2023).unwrap();
        assert_eq!(msg.originator, "WXR");
        assert_eq!(msg.event_code, "RWT");
        assert_eq!(msg.fips_list.len(), 8);
        assert_eq!(msg.purge_minutes, 30);
        assert_eq!(msg.station, "KEAX/NWS");
        assert_eq!(msg.category(), EventCategory::Test);
        assert!(msg.end_time_sec > msg.start_time_sec);
    }

    #[test]
    fn rejects_duplicate_fips() {
        let header = "-WXR-SVR-037183-037183+0045-1232003-KRAH/NWS-";
        assert!(SameMessage::parse(header, 2023).is_err());
    }

    #[test]
    fn storm_message_parses_with_expected_window() {
        let header = "-WXR-SVR-037183+0045-1232003-KRAH/NWS-";
        let msg = SameMessage::parse(header, 2023).unwrap();
        assert_eq!(msg.category(), EventCategory::Warning);
        assert_eq!(msg.end_time_sec - msg.start_time_sec, 45 * 60);
    }
}
