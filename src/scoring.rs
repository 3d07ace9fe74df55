//! Priority scoring for `EventMessageGroup`s, grounded in the periodic
//! ranking heuristic used to pick which boats to focus a broadcast on: a
//! tick-driven per-item score, sorted descending, ties broken
//! deterministically. Here the ranking is over weather alerts rather than
//! racing boats, and the score is bounded to `0..=100` (spec.md §4.4).

use crate::location::Location;
use crate::message::{AlertState, EventMessageGroup, DEFAULT_GRACE_SEC};
use crate::same::EventCategory;

/// Always considers a message's polygon before falling back to FIPS
/// matching, matching `cache.rs`'s own partitioning (spec.md §4.2).
const CONSIDER_POLYGON: bool = true;

/// Both scoring functions share this shape so `MessageCache` can hold either
/// behind one function pointer. Per spec.md §4.4 a score is always a
/// function of the group, the receiver's location, and "now" together —
/// never of the group alone — since every policy here-gates its result:
/// a group that doesn't touch `location` never contributes to the
/// cache's aggregate score, no matter how severe its category.
pub type ScoringFn = fn(&EventMessageGroup, &Location, i64) -> i32;

/// SAME base-priority table (spec.md §4.4). Never reports a score for a
/// group that is not currently active, nor for one that doesn't touch
/// `location` — an elsewhere alert is always 0, regardless of severity.
pub fn by_score_and_time(group: &EventMessageGroup, location: &Location, now: i64) -> i32 {
    if group.state(now, 0) != AlertState::Active {
        return 0;
    }
    if !group.touches_location(location, CONSIDER_POLYGON) {
        return 0;
    }
    let latest = group.latest();
    let code = latest.code();
    match latest.category() {
        EventCategory::Warning => match code.as_str() {
            "TOR" => 40,
            "SVR" | "FFW" => 30,
            _ => 20,
        },
        EventCategory::Watch => match code.as_str() {
            "SVA" => 20,
            _ => 10,
        },
        EventCategory::Advisory => 10,
        EventCategory::Test | EventCategory::Unknown => 0,
    }
}

/// VTEC priority table (spec.md §4.4). Unlike `by_score_and_time`, a group
/// that is past its end time isn't flattened straight to zero: it decays by
/// 10 points per grace interval elapsed, so a still-retained-but-stale
/// warning drops out of the top of the ranking gradually rather than
/// vanishing the instant the clock ticks past `end_time`. A group that
/// doesn't touch `location` is still 0 regardless of how much of its grace
/// period remains — `.SV.A`/`.TO.A` score 25 only when confirmed here.
pub fn default_vtec_sort(group: &EventMessageGroup, location: &Location, now: i64) -> i32 {
    let latest = group.latest();
    if latest.is_terminal() {
        return 0;
    }
    let end = group.get_end_time_sec();
    let grace = DEFAULT_GRACE_SEC;
    if now > end + grace {
        return 0;
    }
    if !group.touches_location(location, CONSIDER_POLYGON) {
        return 0;
    }

    let base = match latest.code().as_str() {
        "TO.W" => 40,
        "SV.W" | "FF.W" => 30,
        "FA.W" => 25,
        "FL.W" => 10,
        "SV.A" | "TO.A" => 25,
        _ => 15,
    };

    if now <= end {
        return base;
    }
    let elapsed = now - end;
    let steps = (elapsed / grace) + 1;
    (base - (steps as i32) * 10).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::same::SameMessage;
    use crate::vtec::VtecMessage;

    fn here() -> Location {
        Location::new(35.73, -78.85, "037183")
    }

    fn elsewhere() -> Location {
        Location::new(35.73, -78.85, "029047")
    }

    fn same_group(header: &str) -> EventMessageGroup {
        let msg = SameMessage::parse(header, 2023).unwrap();
        let mut group = EventMessageGroup::new(msg.event_id());
        group.add_message(Box::new(msg), 0);
        group
    }

    fn vtec_group(pvtec: &str, published: i64) -> EventMessageGroup {
        let msg = VtecMessage::parse_pvtec(pvtec, published, vec!["037183".to_string()], None).unwrap();
        let mut group = EventMessageGroup::new(msg.event_id());
        group.add_message(Box::new(msg), 0);
        group
    }

    #[test]
    fn tornado_warning_outranks_severe_thunderstorm() {
        let tor = same_group("-WXR-TOR-037183+0030-1232000-KRAH/NWS-");
        let svr = same_group("-WXR-SVR-037183+0030-1232000-KRAH/NWS-");
        let now = tor.get_start_time_sec();
        assert_eq!(by_score_and_time(&tor, &here(), now), 40);
        assert_eq!(by_score_and_time(&svr, &here(), now), 30);
    }

    #[test]
    fn expired_same_group_scores_zero() {
        let group = same_group("-WXR-TOR-037183+0030-1232000-KRAH/NWS-");
        let past_end = group.get_end_time_sec() + 1;
        assert_eq!(by_score_and_time(&group, &here(), past_end), 0);
    }

    #[test]
    fn elsewhere_same_group_never_scores() {
        let tor = same_group("-WXR-TOR-037183+0030-1232000-KRAH/NWS-");
        let now = tor.get_start_time_sec();
        assert_eq!(by_score_and_time(&tor, &elsewhere(), now), 0);
    }

    #[test]
    fn vtec_tornado_warning_scores_above_flood_advisory() {
        let tow = vtec_group("/O.NEW.KGLD.TO.W.0028.160525T0145Z-160525T0230Z/", 1464140700);
        let faw = vtec_group("/O.NEW.KDDC.FA.W.0014.160525T0145Z-160525T0230Z/", 1464140700);
        let now = tow.get_start_time_sec();
        assert_eq!(default_vtec_sort(&tow, &here(), now), 40);
        assert_eq!(default_vtec_sort(&faw, &here(), now), 25);
    }

    #[test]
    fn cancelled_vtec_group_scores_zero() {
        let group = vtec_group("/O.CAN.KGLD.TO.W.0028.160525T0145Z-160525T0230Z/", 1464140700);
        assert_eq!(default_vtec_sort(&group, &here(), group.get_start_time_sec()), 0);
    }

    #[test]
    fn vtec_score_decays_after_end_within_grace() {
        let group = vtec_group("/O.NEW.KGLD.TO.W.0028.160525T0145Z-160525T0230Z/", 1464140700);
        let end = group.get_end_time_sec();
        assert_eq!(default_vtec_sort(&group, &here(), end), 40);
        assert_eq!(default_vtec_sort(&group, &here(), end + DEFAULT_GRACE_SEC / 2), 30);
        assert_eq!(default_vtec_sort(&group, &here(), end + DEFAULT_GRACE_SEC + 1), 0);
    }

    #[test]
    fn watch_scores_twenty_five_here_and_zero_elsewhere() {
        let watch = vtec_group("/O.NEW.KWNS.TO.A.0206.160525T0000Z-160525T1200Z/", 1464134400);
        let now = watch.get_start_time_sec();
        assert_eq!(default_vtec_sort(&watch, &here(), now), 25);
        assert_eq!(default_vtec_sort(&watch, &elsewhere(), now), 0);
    }
}
