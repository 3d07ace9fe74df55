use crate::location::{fips_list_matches, Location, Polygon};
use crate::same::EventCategory;

/// Common surface both `SameMessage` and `VtecMessage` expose to the group
/// and scoring logic, per the "Variant messages" unification in spec.md §9.
pub trait Message: std::fmt::Debug {
    fn event_id(&self) -> String;
    fn start_time_sec(&self) -> i64;
    fn end_time_sec(&self) -> i64;
    fn fips_list(&self) -> &[String];
    fn polygon(&self) -> Option<&Polygon>;
    /// True if this update's action terminates the event (VTEC CAN/EXP).
    /// SAME carries no such action and is never terminal by itself.
    fn is_terminal(&self) -> bool;
    fn category(&self) -> EventCategory;
    /// When this update was published/issued — used for group ordering.
    fn published_time_sec(&self) -> i64;
    /// A short, scoring-facing code identifying the specific alert kind:
    /// the SAME event code (`"TOR"`) or the VTEC phenomenon/significance
    /// pair (`"TO.W"`). Distinct from `category()`, which only carries the
    /// coarse warning/watch/advisory/test classification.
    fn code(&self) -> String;
}

/// A group member plus the order in which it was added to the cache, used
/// to break priority/end-time ties deterministically (spec.md §4.3).
#[derive(Debug)]
struct GroupMember {
    message: Box<dyn Message>,
    inserted_seq: u64,
}

/// The lifecycle state of a group's latest member relative to `now`,
/// computed on demand — never stored (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Pending,
    Active,
    Cancelled,
    Expired,
}

/// Default retention grace period past `end_time_sec` (spec.md §3).
pub const DEFAULT_GRACE_SEC: i64 = 300;

/// All updates received for a single event, ordered by published time.
#[derive(Debug)]
pub struct EventMessageGroup {
    event_id: String,
    members: Vec<GroupMember>,
}

impl EventMessageGroup {
    pub fn new(event_id: impl Into<String>) -> Self {
        Self { event_id: event_id.into(), members: Vec::new() }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Append an update and re-sort by published-time ascending.
    pub fn add_message(&mut self, message: Box<dyn Message>, inserted_seq: u64) {
        self.members.push(GroupMember { message, inserted_seq });
        self.members.sort_by(|a, b| {
            a.message
                .published_time_sec()
                .cmp(&b.message.published_time_sec())
                .then(a.inserted_seq.cmp(&b.inserted_seq))
        });
    }

    /// The most recently published member, which governs the group's
    /// effective window and state (spec.md §3).
    pub fn latest(&self) -> &dyn Message {
        self.members.last().expect("group is never empty").message.as_ref()
    }

    pub fn latest_inserted_seq(&self) -> u64 {
        self.members.last().expect("group is never empty").inserted_seq
    }

    pub fn get_start_time_sec(&self) -> i64 {
        self.latest().start_time_sec()
    }

    pub fn get_end_time_sec(&self) -> i64 {
        self.latest().end_time_sec()
    }

    pub fn state(&self, now: i64, grace: i64) -> AlertState {
        let latest = self.latest();
        if latest.is_terminal() {
            return AlertState::Cancelled;
        }
        if now < latest.start_time_sec() {
            return AlertState::Pending;
        }
        if now > latest.end_time_sec() + grace {
            return AlertState::Expired;
        }
        AlertState::Active
    }

    /// FIPS match alone, ignoring time and cancellation — spec.md §4.2.
    pub fn applies_to_fips(&self, fips6: &str) -> bool {
        fips_list_matches(self.latest().fips_list(), fips6)
    }

    /// Polygon-or-FIPS coverage test, ignoring time and cancellation. Used
    /// to split currently-effective groups into "here" and "elsewhere"
    /// (spec.md §4.2).
    pub fn touches_location(&self, location: &Location, consider_polygon: bool) -> bool {
        let latest = self.latest();
        if consider_polygon {
            if let Some(poly) = latest.polygon() {
                return poly.contains(location.lat, location.lon);
            }
        }
        self.applies_to_fips(&location.fips6)
    }

    /// True iff the latest member is effective (time window, not
    /// cancelled) AND its coverage touches `location` — spec.md §4.2.
    pub fn is_effective(&self, location: &Location, consider_polygon: bool, now: i64) -> bool {
        let latest = self.latest();
        if latest.is_terminal() {
            return false;
        }
        if now < latest.start_time_sec() || now > latest.end_time_sec() {
            return false;
        }
        self.touches_location(location, consider_polygon)
    }

    /// True iff effective and the coverage touches `location` — regardless
    /// of here/elsewhere, used to decide whether a group participates in
    /// re-evaluation at all.
    pub fn is_currently_effective(&self, now: i64) -> bool {
        let latest = self.latest();
        !latest.is_terminal() && now >= latest.start_time_sec() && now <= latest.end_time_sec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::same::SameMessage;

    fn boxed(header: &str) -> Box<dyn Message> {
        Box::new(SameMessage::parse(header, 2023).unwrap())
    }

    #[test]
    fn group_tracks_latest_by_published_time() {
        let mut group = EventMessageGroup::new("evt");
        group.add_message(boxed("-WXR-SVR-037183+0045-1232003-KRAH/NWS-"), 0);
        assert_eq!(group.len(), 1);
        let loc = Location::new(35.73, -78.85, "037183");
        assert!(group.is_effective(&loc, false, group.get_start_time_sec()));
        assert!(!group.is_effective(&loc, false, group.get_end_time_sec() + 1));
    }

    #[test]
    fn fips_match_ignores_part_of_county() {
        let mut group = EventMessageGroup::new("evt");
        group.add_message(boxed("-WXR-SVR-037183+0045-1232003-KRAH/NWS-"), 0);
        assert!(group.applies_to_fips("137183"));
        assert!(!group.applies_to_fips("137184"));
    }
}
