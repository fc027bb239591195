//! Per-step resource occupancy tracking.

use crate::graph::ClassId;

/// Number of operations of each resource class occupying each control step.
///
/// Steps are 1-based; row 0 is never used. The table grows lazily when a step
/// beyond the current horizon is first touched, and counts only ever increase.
#[derive(Clone, Debug)]
pub struct OccupancyTable {
    /// `steps[t][class]` = operations of `class` whose interval covers step t
    steps: Vec<Vec<u32>>,
    /// Historical maximum count observed per class
    peak: Vec<u32>,
    class_count: usize,
}

impl OccupancyTable {
    /// Create a table for `class_count` classes, pre-sized to `horizon` steps.
    pub fn new(class_count: usize, horizon: u32) -> Self {
        Self {
            steps: vec![vec![0; class_count]; horizon as usize + 1],
            peak: vec![0; class_count],
            class_count,
        }
    }

    fn ensure_step(&mut self, step: u32) {
        let needed = step as usize + 1;
        if self.steps.len() < needed {
            self.steps.resize(needed, vec![0; self.class_count]);
        }
    }

    /// Add `count` occupants of `class` at `step`.
    pub fn reserve(&mut self, step: u32, class: ClassId, count: u32) {
        self.ensure_step(step);
        let slot = &mut self.steps[step as usize][class];
        *slot += count;
        if *slot > self.peak[class] {
            self.peak[class] = *slot;
        }
    }

    /// Occupy `[start, start + delay - 1]` with one operation of `class`.
    pub fn reserve_span(&mut self, start: u32, delay: u32, class: ClassId) {
        for step in start..start + delay {
            self.reserve(step, class, 1);
        }
    }

    /// Occupancy of `class` at `step`; 0 for steps never touched.
    #[inline]
    pub fn occupancy_at(&self, step: u32, class: ClassId) -> u32 {
        self.steps
            .get(step as usize)
            .map(|row| row[class])
            .unwrap_or(0)
    }

    /// Summed occupancy over `[start, start + delay - 1]`.
    pub fn span_cost(&self, start: u32, delay: u32, class: ClassId) -> u32 {
        (start..start + delay)
            .map(|step| self.occupancy_at(step, class))
            .sum()
    }

    /// Whether one more operation fits under `limit` at every step of the span.
    pub fn fits(&self, start: u32, delay: u32, class: ClassId, limit: u32) -> bool {
        (start..start + delay).all(|step| self.occupancy_at(step, class) < limit)
    }

    /// Historical maximum occupancy of `class`.
    #[inline]
    pub fn peak(&self, class: ClassId) -> u32 {
        self.peak[class]
    }

    /// Last step the table currently covers.
    #[cfg(test)]
    fn horizon(&self) -> u32 {
        (self.steps.len() - 1) as u32
    }

    /// Occupancy of `class` for steps `1..=last`.
    pub fn profile(&self, class: ClassId, last: u32) -> Vec<u32> {
        (1..=last).map(|step| self.occupancy_at(step, class)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table() {
        let table = OccupancyTable::new(2, 4);
        assert_eq!(table.horizon(), 4);
        assert_eq!(table.occupancy_at(3, 1), 0);
        assert_eq!(table.occupancy_at(100, 0), 0);
        assert_eq!(table.peak(0), 0);
    }

    #[test]
    fn test_reserve_and_peak() {
        let mut table = OccupancyTable::new(2, 4);
        table.reserve(2, 0, 1);
        table.reserve(2, 0, 2);
        table.reserve(3, 1, 1);
        assert_eq!(table.occupancy_at(2, 0), 3);
        assert_eq!(table.occupancy_at(2, 1), 0);
        assert_eq!(table.peak(0), 3);
        assert_eq!(table.peak(1), 1);
    }

    #[test]
    fn test_table_grows_on_demand() {
        let mut table = OccupancyTable::new(1, 0);
        table.reserve_span(5, 2, 0);
        assert_eq!(table.horizon(), 6);
        assert_eq!(table.profile(0, 6), vec![0, 0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_span_cost_and_fits() {
        let mut table = OccupancyTable::new(1, 6);
        table.reserve_span(2, 2, 0);
        table.reserve(3, 0, 1);
        assert_eq!(table.span_cost(1, 2, 0), 1);
        assert_eq!(table.span_cost(2, 2, 0), 3);
        assert!(table.fits(1, 1, 0, 1));
        assert!(!table.fits(1, 2, 0, 1));
        assert!(table.fits(3, 1, 0, 3));
        assert!(!table.fits(3, 1, 0, 2));
        assert!(table.fits(4, 3, 0, 1));
    }
}
