use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use super::domain::{DelayReason, FlightState, FlightStatus};

/// Deterministic flight-state source: curated reference data first, pure
/// hash-seeded synthesis for everything else. Lookup always succeeds, so
/// the `FLIGHT_DATA_FETCH` stage can never fail under this provider.
pub struct FlightStateProvider {
    curated: BTreeMap<String, FlightState>,
}

impl Default for FlightStateProvider {
    fn default() -> Self {
        Self::with_reference_data()
    }
}

impl FlightStateProvider {
    pub fn with_reference_data() -> Self {
        let mut curated = BTreeMap::new();
        for state in reference_flights() {
            curated.insert(flight_key(&state.flight_no, state.flight_date), state);
        }
        Self { curated }
    }

    /// Resolve the state for one flight. Identical inputs always yield an
    /// identical state, with no dependency on wall-clock time or I/O.
    pub fn state_for(&self, flight_no: &str, flight_date: NaiveDate) -> FlightState {
        match self.curated.get(&flight_key(flight_no, flight_date)) {
            Some(state) => state.clone(),
            None => synthesize(flight_no, flight_date),
        }
    }

    pub fn is_curated(&self, flight_no: &str, flight_date: NaiveDate) -> bool {
        self.curated.contains_key(&flight_key(flight_no, flight_date))
    }

    pub fn reference_data(&self) -> impl Iterator<Item = &FlightState> {
        self.curated.values()
    }
}

fn flight_key(flight_no: &str, flight_date: NaiveDate) -> String {
    format!("{flight_no}-{flight_date}")
}

/// Stable 31-polynomial rolling hash on a wrapping 32-bit integer,
/// reproducible across runs and languages.
pub(crate) fn stable_hash(input: &str) -> u32 {
    let mut hash: i32 = 0;
    for ch in input.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(ch as i32);
    }
    hash.unsigned_abs()
}

/// Derive a flight state for a flight absent from the curated table. Every
/// field is a pure function of the seed so audits and regression runs can
/// replay the exact same state.
fn synthesize(flight_no: &str, flight_date: NaiveDate) -> FlightState {
    let seed = stable_hash(&flight_key(flight_no, flight_date));

    let delay_probability = (seed % 100) as f64 / 100.0;
    let delay_magnitude = seed % 720;
    let reason_index = (seed % 5) as usize;

    const REASON_CYCLE: [DelayReason; 5] = [
        DelayReason::Operational,
        DelayReason::Operational,
        DelayReason::Weather,
        DelayReason::Operational,
        DelayReason::ForceMajeure,
    ];

    // Roughly 70% of synthesized flights carry some delay.
    let has_delay = delay_probability > 0.3;
    let delay_minutes = if has_delay { delay_magnitude.max(30) } else { 0 };
    let delay_reason = if has_delay {
        REASON_CYCLE[reason_index]
    } else {
        DelayReason::None
    };

    let mut status = FlightStatus::OnTime;
    if delay_minutes > 0 && delay_minutes < 9999 {
        status = FlightStatus::Delayed;
    } else if delay_probability > 0.95 {
        status = FlightStatus::Cancelled;
    }

    let scheduled_hour = seed % 18 + 6;
    let scheduled_arrival = arrival(flight_date, 0, scheduled_hour, 0);

    let actual_arrival = if status == FlightStatus::Cancelled {
        None
    } else {
        Some(scheduled_arrival + Duration::minutes(i64::from(delay_minutes)))
    };

    let cancelled = status == FlightStatus::Cancelled;
    FlightState {
        flight_no: flight_no.to_string(),
        flight_date,
        scheduled_arrival,
        actual_arrival,
        delay_minutes: if cancelled { 9999 } else { delay_minutes },
        delay_reason: if cancelled {
            DelayReason::Carrier
        } else {
            delay_reason
        },
        status,
    }
}

fn arrival(date: NaiveDate, day_offset: i64, hour: u32, minute: u32) -> DateTime<Utc> {
    let base = Utc
        .from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default());
    base + Duration::days(day_offset) + Duration::hours(i64::from(hour)) + Duration::minutes(i64::from(minute))
}

struct ReferenceFlight {
    flight_no: &'static str,
    date: (i32, u32, u32),
    scheduled: (u32, u32),
    // (day offset, hour, minute); None for cancelled flights.
    actual: Option<(i64, u32, u32)>,
    delay_minutes: u32,
    reason: DelayReason,
    status: FlightStatus,
}

impl ReferenceFlight {
    fn into_state(self) -> FlightState {
        let (y, m, d) = self.date;
        let date = NaiveDate::from_ymd_opt(y, m, d).expect("valid reference flight date");
        FlightState {
            flight_no: self.flight_no.to_string(),
            flight_date: date,
            scheduled_arrival: arrival(date, 0, self.scheduled.0, self.scheduled.1),
            actual_arrival: self
                .actual
                .map(|(days, hour, minute)| arrival(date, days, hour, minute)),
            delay_minutes: self.delay_minutes,
            delay_reason: self.reason,
            status: self.status,
        }
    }
}

/// Curated reference flights covering EU, US, and APAC routes across every
/// payout tier plus the exclusion and no-payout scenarios.
fn reference_flights() -> Vec<FlightState> {
    use DelayReason::{Carrier, CrewStrike, ForceMajeure, None as NoReason, Operational, Weather};
    use FlightStatus::{Cancelled, Delayed, OnTime};

    let rows = [
        // EU routes.
        ReferenceFlight { flight_no: "BA123", date: (2024, 12, 20), scheduled: (14, 0), actual: Some((0, 16, 30)), delay_minutes: 150, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "AF101", date: (2024, 12, 21), scheduled: (10, 0), actual: Some((0, 11, 45)), delay_minutes: 105, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "LH456", date: (2024, 12, 20), scheduled: (9, 0), actual: Some((0, 15, 30)), delay_minutes: 390, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "KL205", date: (2024, 12, 21), scheduled: (16, 0), actual: Some((0, 19, 40)), delay_minutes: 220, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "IB302", date: (2024, 12, 19), scheduled: (14, 0), actual: Some((0, 19, 0)), delay_minutes: 300, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "SK600", date: (2024, 12, 22), scheduled: (8, 0), actual: Some((0, 15, 0)), delay_minutes: 420, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "BA789", date: (2024, 12, 18), scheduled: (22, 0), actual: Some((1, 8, 30)), delay_minutes: 630, reason: Operational, status: Delayed },
        // US routes.
        ReferenceFlight { flight_no: "AA100", date: (2024, 12, 20), scheduled: (18, 0), actual: Some((0, 19, 10)), delay_minutes: 70, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "JB524", date: (2024, 12, 21), scheduled: (12, 0), actual: Some((0, 13, 50)), delay_minutes: 110, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "UA200", date: (2024, 12, 19), scheduled: (15, 0), actual: Some((0, 18, 0)), delay_minutes: 180, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "DL450", date: (2024, 12, 22), scheduled: (20, 0), actual: Some((0, 23, 30)), delay_minutes: 210, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "WN333", date: (2024, 12, 20), scheduled: (10, 0), actual: Some((0, 15, 30)), delay_minutes: 330, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "UA100", date: (2024, 12, 18), scheduled: (22, 0), actual: Some((1, 8, 0)), delay_minutes: 600, reason: Operational, status: Delayed },
        // APAC routes.
        ReferenceFlight { flight_no: "SQ321", date: (2024, 12, 21), scheduled: (6, 0), actual: Some((0, 7, 30)), delay_minutes: 90, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "CX888", date: (2024, 12, 20), scheduled: (23, 0), actual: Some((1, 1, 15)), delay_minutes: 135, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "JL005", date: (2024, 12, 22), scheduled: (14, 0), actual: Some((0, 17, 20)), delay_minutes: 200, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "QF001", date: (2024, 12, 19), scheduled: (5, 0), actual: Some((0, 11, 30)), delay_minutes: 390, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "NH102", date: (2024, 12, 18), scheduled: (9, 0), actual: Some((0, 18, 30)), delay_minutes: 570, reason: Operational, status: Delayed },
        // Exclusion scenarios.
        ReferenceFlight { flight_no: "AA200", date: (2024, 12, 20), scheduled: (16, 0), actual: Some((0, 20, 0)), delay_minutes: 240, reason: Weather, status: Delayed },
        ReferenceFlight { flight_no: "DL300", date: (2024, 12, 19), scheduled: (12, 0), actual: Some((0, 18, 0)), delay_minutes: 360, reason: ForceMajeure, status: Delayed },
        ReferenceFlight { flight_no: "IB400", date: (2024, 12, 18), scheduled: (10, 0), actual: Some((0, 16, 0)), delay_minutes: 360, reason: CrewStrike, status: Delayed },
        // On time.
        ReferenceFlight { flight_no: "KL500", date: (2024, 12, 20), scheduled: (11, 0), actual: Some((0, 10, 55)), delay_minutes: 0, reason: NoReason, status: OnTime },
        ReferenceFlight { flight_no: "SQ100", date: (2024, 12, 21), scheduled: (19, 0), actual: Some((0, 19, 5)), delay_minutes: 5, reason: NoReason, status: OnTime },
        // Below every threshold.
        ReferenceFlight { flight_no: "SK600", date: (2024, 12, 20), scheduled: (15, 0), actual: Some((0, 15, 45)), delay_minutes: 45, reason: Operational, status: Delayed },
        ReferenceFlight { flight_no: "AF789", date: (2024, 12, 19), scheduled: (18, 0), actual: Some((0, 18, 50)), delay_minutes: 50, reason: Operational, status: Delayed },
        // Cancellations.
        ReferenceFlight { flight_no: "EK700", date: (2024, 12, 19), scheduled: (20, 0), actual: None, delay_minutes: 9999, reason: Carrier, status: Cancelled },
        ReferenceFlight { flight_no: "QF050", date: (2024, 12, 22), scheduled: (7, 0), actual: None, delay_minutes: 9999, reason: Operational, status: Cancelled },
    ];

    rows.into_iter().map(ReferenceFlight::into_state).collect()
}
