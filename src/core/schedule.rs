use serde::Serialize;

use super::types::{BandId, UpperBound, coerce_finite};

pub const DEFAULT_NEW_BAND_RATE: f64 = 0.3;
const DEFAULT_NEW_BAND_WIDTH: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBand {
    pub id: BandId,
    pub from: f64,
    pub to: UpperBound,
    pub rate: f64,
}

impl TierBand {
    pub fn new(from: f64, to: UpperBound, rate: f64) -> Self {
        Self {
            id: BandId::new(),
            from,
            to,
            rate,
        }
    }

    /// Inclusive integer range size, or `None` for the open-ended band.
    /// Inverted ranges have no capacity.
    pub fn capacity(&self) -> Option<f64> {
        self.to.finite().map(|to| (to - self.from + 1.0).max(0.0))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BandField {
    From,
    To,
    Rate,
}

/// Ordered set of price bands. Mutations keep the bands sorted by `from` but
/// never reject gaps or overlaps.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TierSchedule {
    bands: Vec<TierBand>,
}

impl Default for TierSchedule {
    fn default() -> Self {
        Self::from_bands(vec![
            TierBand::new(1.0, UpperBound::Finite(200.0), 0.218),
            TierBand::new(201.0, UpperBound::Finite(300.0), 0.334),
            TierBand::new(301.0, UpperBound::Finite(600.0), 0.516),
            TierBand::new(601.0, UpperBound::Unbounded, 0.546),
        ])
    }
}

impl TierSchedule {
    pub fn from_bands(mut bands: Vec<TierBand>) -> Self {
        sort_bands(&mut bands);
        Self { bands }
    }

    pub fn bands(&self) -> &[TierBand] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    pub fn get(&self, id: BandId) -> Option<&TierBand> {
        self.bands.iter().find(|b| b.id == id)
    }

    /// Inserts a finite band directly before the open-ended terminal band and
    /// returns its id.
    pub fn add_band(&mut self) -> BandId {
        let terminal_index = self
            .bands
            .last()
            .filter(|b| b.to.is_unbounded())
            .map(|_| self.bands.len() - 1);
        let insert_at = terminal_index.unwrap_or(self.bands.len());

        let from = self.bands[..insert_at]
            .iter()
            .rev()
            .find_map(|b| b.to.finite())
            .map(|to| to + 1.0)
            .unwrap_or(1.0);
        let band = TierBand::new(
            from,
            UpperBound::Finite(from + DEFAULT_NEW_BAND_WIDTH - 1.0),
            DEFAULT_NEW_BAND_RATE,
        );
        let id = band.id;
        self.bands.insert(insert_at, band);
        id
    }

    /// Sets one field of a band, then re-sorts the schedule by `from`.
    /// The upper bound of the open-ended band is not editable. Non-finite
    /// values are stored as 0.
    pub fn update_band(&mut self, id: BandId, field: BandField, value: f64) -> bool {
        let value = coerce_finite(value);
        let Some(band) = self.bands.iter_mut().find(|b| b.id == id) else {
            return false;
        };
        match field {
            BandField::From => band.from = value,
            BandField::To => {
                if !band.to.is_unbounded() {
                    band.to = UpperBound::Finite(value);
                }
            }
            BandField::Rate => band.rate = value,
        }
        sort_bands(&mut self.bands);
        true
    }

    /// Removes a finite band. The open-ended band stays.
    pub fn remove_band(&mut self, id: BandId) -> bool {
        let Some(index) = self.bands.iter().position(|b| b.id == id) else {
            return false;
        };
        if self.bands[index].to.is_unbounded() {
            return false;
        }
        self.bands.remove(index);
        true
    }

    /// Describes gaps, overlaps and a missing open-ended band. The schedule is
    /// still usable as-is; callers decide what to do with these.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for (idx, band) in self.bands.iter().enumerate() {
            if band.to.is_unbounded() && idx + 1 != self.bands.len() {
                warnings.push(format!(
                    "open-ended band starting at {} is not the last band",
                    band.from
                ));
            }
            if let Some(to) = band.to.finite() {
                if to < band.from {
                    warnings.push(format!("band {}-{to} has an inverted range", band.from));
                }
            }
        }
        for pair in self.bands.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let Some(prev_to) = prev.to.finite() else {
                continue;
            };
            let expected = prev_to + 1.0;
            if next.from > expected {
                warnings.push(format!("gap between {prev_to} and {}", next.from));
            } else if next.from < expected {
                warnings.push(format!(
                    "band starting at {} overlaps band ending at {prev_to}",
                    next.from
                ));
            }
        }
        if !self.bands.last().is_some_and(|b| b.to.is_unbounded()) {
            warnings.push("schedule has no open-ended top band".to_string());
        }
        warnings
    }
}

fn sort_bands(bands: &mut [TierBand]) {
    bands.sort_by(|a, b| a.from.total_cmp(&b.from));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn froms(schedule: &TierSchedule) -> Vec<f64> {
        schedule.bands().iter().map(|b| b.from).collect()
    }

    #[test]
    fn default_schedule_ends_with_open_band() {
        let schedule = TierSchedule::default();
        assert_eq!(froms(&schedule), vec![1.0, 201.0, 301.0, 601.0]);
        assert_eq!(schedule.bands()[0].capacity(), Some(200.0));
        assert_eq!(schedule.bands()[2].capacity(), Some(300.0));
        assert_eq!(schedule.bands()[3].capacity(), None);
        assert!(schedule.warnings().is_empty());
    }

    #[test]
    fn add_band_inserts_before_open_band() {
        let mut schedule = TierSchedule::default();
        let id = schedule.add_band();

        assert_eq!(schedule.len(), 5);
        let added = &schedule.bands()[3];
        assert_eq!(added.id, id);
        assert_eq!(added.from, 601.0);
        assert_eq!(added.to, UpperBound::Finite(700.0));
        assert_eq!(added.rate, DEFAULT_NEW_BAND_RATE);
        assert!(schedule.bands()[4].to.is_unbounded());
    }

    #[test]
    fn add_band_appends_when_no_open_band() {
        let mut schedule =
            TierSchedule::from_bands(vec![TierBand::new(1.0, UpperBound::Finite(50.0), 0.1)]);
        schedule.add_band();
        assert_eq!(froms(&schedule), vec![1.0, 51.0]);
    }

    #[test]
    fn update_band_resorts_by_from() {
        let mut schedule = TierSchedule::default();
        let first = schedule.bands()[0].id;

        assert!(schedule.update_band(first, BandField::From, 400.0));
        assert_eq!(froms(&schedule), vec![201.0, 301.0, 400.0, 601.0]);
        assert_eq!(schedule.bands()[2].id, first);
    }

    #[test]
    fn update_band_keeps_open_band_unbounded() {
        let mut schedule = TierSchedule::default();
        let terminal = schedule.bands()[3].id;

        assert!(schedule.update_band(terminal, BandField::To, 900.0));
        assert!(schedule.get(terminal).is_some_and(|b| b.to.is_unbounded()));
        assert!(schedule.update_band(terminal, BandField::Rate, 0.6));
        assert_eq!(schedule.get(terminal).map(|b| b.rate), Some(0.6));
    }

    #[test]
    fn update_band_stores_non_finite_values_as_zero() {
        let mut schedule = TierSchedule::default();
        let id = schedule.bands()[1].id;
        assert!(schedule.update_band(id, BandField::To, f64::NAN));
        assert!(schedule.update_band(id, BandField::Rate, f64::INFINITY));

        let band = schedule.get(id).expect("band exists");
        assert_eq!(band.to, UpperBound::Finite(0.0));
        assert_eq!(band.rate, 0.0);

        let json = serde_json::to_string(&schedule).expect("serialize");
        assert!(!json.contains("null"), "{json}");
    }

    #[test]
    fn update_band_with_unknown_id_is_noop() {
        let mut schedule = TierSchedule::default();
        let before = schedule.clone();
        assert!(!schedule.update_band(BandId::new(), BandField::Rate, 1.0));
        assert_eq!(schedule, before);
    }

    #[test]
    fn remove_band_refuses_open_band() {
        let mut schedule = TierSchedule::default();
        let second = schedule.bands()[1].id;
        let terminal = schedule.bands()[3].id;

        assert!(!schedule.remove_band(terminal));
        assert!(schedule.remove_band(second));
        assert_eq!(froms(&schedule), vec![1.0, 301.0, 601.0]);
    }

    #[test]
    fn overlaps_and_gaps_are_reported_not_rejected() {
        let mut schedule = TierSchedule::default();
        let second = schedule.bands()[1].id;
        schedule.update_band(second, BandField::From, 150.0);
        let third = schedule.bands()[2].id;
        schedule.update_band(third, BandField::From, 350.0);

        let warnings = schedule.warnings();
        assert_eq!(schedule.len(), 4);
        assert!(warnings.iter().any(|w| w.contains("overlaps")));
        assert!(warnings.iter().any(|w| w.contains("gap")));
    }

    #[test]
    fn inverted_band_has_zero_capacity() {
        let band = TierBand::new(300.0, UpperBound::Finite(100.0), 0.2);
        assert_eq!(band.capacity(), Some(0.0));
    }
}
