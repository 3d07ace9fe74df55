//! SAME header reconstruction and a time-aware cache/scorer for NOAA
//! Weather Radio and VTEC alerts.
//!
//! This crate has three layers: decoding noisy SAME headers into
//! [`same::SameMessage`] and decoding P-VTEC strings into
//! [`vtec::VtecMessage`] (both implement [`message::Message`]); grouping a
//! series of updates for one event into an [`message::EventMessageGroup`]
//! and computing its lifecycle state; and [`cache::MessageCache`], which
//! holds one group per event, scores it, and reports which alerts are
//! currently effective for a fixed receiver location.
//!
//! Nothing here reads a clock, a socket, or a config file: callers own the
//! receiver location, the scoring function, and the source of "now".
//! Demodulating audio into noisy byte copies, fetching CAP/VTEC messages
//! over the network, and persisting cache state across restarts are all
//! out of scope — this crate only reconstructs and ranks.

pub mod cache;
pub mod dispatcher;
pub mod error;
pub mod location;
pub mod message;
pub mod same;
pub mod scoring;
pub mod vtec;

pub use cache::{ActiveAlert, MessageCache};
pub use dispatcher::{AlertEvent, AlertObserver, Dispatcher};
pub use error::{AlertError, Result};
pub use location::{Location, Polygon};
pub use message::{AlertState, EventMessageGroup, Message};
pub use same::SameMessage;
pub use scoring::{by_score_and_time, default_vtec_sort};
pub use vtec::VtecMessage;
