use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AlertError, Result};
use crate::location::Polygon;
use crate::message::Message;
use crate::same::EventCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VtecAction {
    New,
    Con,
    Ext,
    Exb,
    Exa,
    Upg,
    Can,
    Exp,
}

impl VtecAction {
    fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "NEW" => VtecAction::New,
            "CON" => VtecAction::Con,
            "EXT" => VtecAction::Ext,
            "EXB" => VtecAction::Exb,
            "EXA" => VtecAction::Exa,
            "UPG" => VtecAction::Upg,
            "CAN" => VtecAction::Can,
            "EXP" => VtecAction::Exp,
            other => return Err(AlertError::VtecDecode(format!("unknown action '{other}'"))),
        })
    }

    /// Terminal actions end an event's effective life immediately,
    /// regardless of its stated end time (spec.md §3 action-sequence
    /// invariant: NEW → (CON|EXT|EXB|EXA|UPG)* → (CAN|EXP)).
    pub fn is_terminal(self) -> bool {
        matches!(self, VtecAction::Can | VtecAction::Exp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Significance {
    Warning,
    Watch,
    Advisory,
    Statement,
}

impl Significance {
    fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "W" => Significance::Warning,
            "A" => Significance::Watch,
            "Y" => Significance::Advisory,
            "S" => Significance::Statement,
            other => return Err(AlertError::VtecDecode(format!("unknown significance '{other}'"))),
        })
    }

    fn letter(self) -> &'static str {
        match self {
            Significance::Warning => "W",
            Significance::Watch => "A",
            Significance::Advisory => "Y",
            Significance::Statement => "S",
        }
    }
}

/// A parsed P-VTEC product, optionally carrying a storm-based warning
/// polygon and/or a UGC county/zone list, plus the time it was published
/// (the group ordering key, spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VtecMessage {
    pub office: String,
    pub phenomenon: String,
    pub significance: Significance,
    pub etn: u32,
    pub action: VtecAction,
    pub start_time_sec: i64,
    pub end_time_sec: i64,
    pub published_time_sec: i64,
    pub ugc: Vec<String>,
    pub polygon: Option<Polygon>,
}

impl VtecMessage {
    /// Parse a bare P-VTEC string: `/K.AAA.CCCC.PP.S.NNNN.YYMMDDTHHMMZ-YYMMDDTHHMMZ/`.
    /// The office field is always present on the wire; `event_id_string`
    /// separately decides whether to surface it.
    pub fn parse_pvtec(
        pvtec: &str,
        published_time_sec: i64,
        ugc: Vec<String>,
        polygon: Option<Polygon>,
    ) -> Result<Self> {
        match Self::parse_pvtec_inner(pvtec, published_time_sec, ugc, polygon) {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!(pvtec, error = %e, "malformed P-VTEC string");
                Err(e)
            }
        }
    }

    fn parse_pvtec_inner(
        pvtec: &str,
        published_time_sec: i64,
        ugc: Vec<String>,
        polygon: Option<Polygon>,
    ) -> Result<Self> {
        let body = pvtec.trim_matches('/');
        let fields: Vec<&str> = body.split('.').collect();
        if fields.len() != 8 {
            return Err(AlertError::VtecDecode(format!("expected 8 dot-fields, got {}", fields.len())));
        }
        let _product_class = fields[0];
        let action = VtecAction::parse(fields[1])?;
        let office_raw = fields[2];
        if office_raw.is_empty() {
            return Err(AlertError::VtecDecode("office field is empty".into()));
        }
        let office = office_raw.to_string();
        let phenomenon = fields[3].to_string();
        let significance = Significance::parse(fields[4])?;
        let etn: u32 = fields[5]
            .parse()
            .map_err(|_| AlertError::VtecDecode(format!("bad ETN '{}'", fields[5])))?;
        let start_time_sec = parse_vtec_time(fields[6])?;
        let end_time_sec = parse_vtec_time(fields[7])?;
        if end_time_sec <= start_time_sec {
            return Err(AlertError::VtecDecode("end time does not follow start time".into()));
        }

        Ok(VtecMessage {
            office,
            phenomenon,
            significance,
            etn,
            action,
            start_time_sec,
            end_time_sec,
            published_time_sec,
            ugc,
            polygon,
        })
    }

    /// Watches are numbered uniquely nationwide by the Storm Prediction
    /// Center regardless of which office's forecast area they touch, so
    /// their event id omits the office the way the national sample in
    /// spec.md §8 does (`TO.A.0206`, not `KWNS.TO.A.0206`). Warnings and
    /// advisories are scoped to the issuing office's area, so their id
    /// keeps it (`KGLD.TO.W.0028`).
    pub fn event_id_string(&self) -> String {
        if self.significance == Significance::Watch {
            format!("{}.{}.{:04}", self.phenomenon, self.significance.letter(), self.etn)
        } else {
            format!("{}.{}.{}.{:04}", self.office, self.phenomenon, self.significance.letter(), self.etn)
        }
    }
}

fn parse_vtec_time(field: &str) -> Result<i64> {
    // YYMMDDTHHMMZ, e.g. 160525T0145Z
    if field.len() != 12 || !field.ends_with('Z') || field.as_bytes()[6] != b'T' {
        return Err(AlertError::VtecDecode(format!("malformed VTEC timestamp '{field}'")));
    }
    let yy: i32 = field[0..2].parse().map_err(|_| AlertError::VtecDecode(field.to_string()))?;
    let mm: u32 = field[2..4].parse().map_err(|_| AlertError::VtecDecode(field.to_string()))?;
    let dd: u32 = field[4..6].parse().map_err(|_| AlertError::VtecDecode(field.to_string()))?;
    let hh: u32 = field[7..9].parse().map_err(|_| AlertError::VtecDecode(field.to_string()))?;
    let min: u32 = field[9..11].parse().map_err(|_| AlertError::VtecDecode(field.to_string()))?;
    let year = 2000 + yy;
    let date = NaiveDate::from_ymd_opt(year, mm, dd)
        .ok_or_else(|| AlertError::VtecDecode(format!("invalid date in '{field}'")))?;
    let time = NaiveTime::from_hms_opt(hh, min, 0)
        .ok_or_else(|| AlertError::VtecDecode(format!("invalid time in '{field}'")))?;
    let dt = NaiveDateTime::new(date, time);
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).timestamp())
}

impl Message for VtecMessage {
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
        &self.ugc
    }

    fn polygon(&self) -> Option<&Polygon> {
        self.polygon.as_ref()
    }

    fn is_terminal(&self) -> bool {
        self.action.is_terminal()
    }

    fn category(&self) -> EventCategory {
        match self.significance {
            Significance::Warning => EventCategory::Warning,
            Significance::Watch => EventCategory::Watch,
            Significance::Advisory => EventCategory::Advisory,
            Significance::Statement => EventCategory::Advisory,
        }
    }

    fn published_time_sec(&self) -> i64 {
        self.published_time_sec
    }

    fn code(&self) -> String {
        format!("{}.{}", self.phenomenon, self.significance.letter())
    }
}
