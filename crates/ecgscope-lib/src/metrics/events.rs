use crate::annotations::{BeatKind, EventFilter};
use crate::metrics::round_to;
use crate::signal::{BeatEvent, Lead, WindowedSeries};
use serde::{Deserialize, Serialize};

/// Default time tolerance when matching an event to a series point (seconds).
pub const EVENT_TOLERANCE_S: f64 = 0.01;

/// Signal value of one lead at an annotated beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventValue {
    pub time: f64,
    pub value: f64,
    #[serde(rename = "type")]
    pub kind: BeatKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventShare {
    #[serde(rename = "type")]
    pub kind: BeatKind,
    pub count: usize,
    /// Share of the filtered events, rounded to one decimal.
    pub percentage: f64,
}

/// Attach the `lead` value at each event, using the default tolerance.
pub fn project_events(
    series: &WindowedSeries,
    lead: Lead,
    events: &[BeatEvent],
    filter: EventFilter,
) -> Vec<EventValue> {
    project_events_with_tolerance(series, lead, events, filter, EVENT_TOLERANCE_S)
}

/// The first point closer than `tolerance` seconds to an event supplies its value;
/// events without such a point, or where the lead is undefined or non-finite there,
/// are dropped.
pub fn project_events_with_tolerance(
    series: &WindowedSeries,
    lead: Lead,
    events: &[BeatEvent],
    filter: EventFilter,
    tolerance: f64,
) -> Vec<EventValue> {
    events
        .iter()
        .filter(|event| filter.matches(event))
        .filter_map(|event| {
            let point = series
                .data
                .iter()
                .find(|point| (point.time - event.time).abs() < tolerance)?;
            let value = point.values.get(&lead).copied().filter(|v| v.is_finite())?;
            Some(EventValue {
                time: event.time,
                value,
                kind: event.kind,
                description: event.description.clone(),
            })
        })
        .collect()
}

/// Count filtered events per type in first-seen order. Empty when nothing matches.
pub fn event_distribution(events: &[BeatEvent], filter: EventFilter) -> Vec<EventShare> {
    let mut shares: Vec<EventShare> = Vec::new();
    let mut total = 0usize;
    for event in events.iter().filter(|event| filter.matches(event)) {
        total += 1;
        match shares.iter_mut().find(|share| share.kind == event.kind) {
            Some(share) => share.count += 1,
            None => shares.push(EventShare {
                kind: event.kind,
                count: 1,
                percentage: 0.0,
            }),
        }
    }
    if total == 0 {
        return Vec::new();
    }
    for share in &mut shares {
        share.percentage = round_to(share.count as f64 / total as f64 * 100.0, 1);
    }
    shares
}

/// Events inside `[start, start + duration]` that pass `filter`.
pub fn visible_events(
    events: &[BeatEvent],
    start: f64,
    duration: f64,
    filter: EventFilter,
) -> Vec<BeatEvent> {
    events
        .iter()
        .filter(|event| filter.matches(event))
        .filter(|event| event.time >= start && event.time <= start + duration)
        .cloned()
        .collect()
}
