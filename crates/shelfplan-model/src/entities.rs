use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a plant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlantId(u32);

impl PlantId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A production line, numbered from 1 within its plant
///
/// Lines only come from [`Plant::new`]; the plant id is a back-reference
/// used for grouping and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProductionLine {
    plant: PlantId,
    index: u32,
}

impl ProductionLine {
    pub fn plant(self) -> PlantId {
        self.plant
    }

    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for ProductionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-L{}", self.plant, self.index)
    }
}

/// A plant and its fixed set of production lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plant {
    id: PlantId,
    lines: Vec<ProductionLine>,
}

impl Plant {
    pub fn new(id: u32, number_of_lines: u32) -> Self {
        let id = PlantId(id);
        let lines = (1..=number_of_lines)
            .map(|index| ProductionLine { plant: id, index })
            .collect();
        Self { id, lines }
    }

    pub fn id(&self) -> PlantId {
        self.id
    }

    pub fn lines(&self) -> &[ProductionLine] {
        &self.lines
    }

    /// Line by its 1-based index
    pub fn line(&self, index: u32) -> Option<ProductionLine> {
        self.lines.iter().copied().find(|l| l.index == index)
    }
}

impl fmt::Display for Plant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Product(u32);

impl Product {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Product{}", self.0)
    }
}

/// A planning day, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Day(u32);

impl Day {
    pub fn new(day: u32) -> Self {
        Self(day)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The day before, or `None` on the first day
    pub fn previous(self) -> Option<Day> {
        (self.0 > 1).then(|| Day(self.0 - 1))
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The ordered days `1..=len` covered by a model instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Horizon {
    len: u32,
}

impl Horizon {
    pub fn new(len: u32) -> Self {
        Self { len }
    }

    pub fn weeks(weeks: u32) -> Self {
        Self { len: weeks * 7 }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn days(&self) -> impl Iterator<Item = Day> + use<> {
        (1..=self.len).map(Day)
    }

    pub fn contains(&self, day: Day) -> bool {
        (1..=self.len).contains(&day.0)
    }

    pub fn last(&self) -> Option<Day> {
        (self.len > 0).then_some(Day(self.len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plant_lines_are_numbered_from_one() {
        let plant = Plant::new(0, 2);
        let labels: Vec<String> = plant.lines().iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["P0-L1", "P0-L2"]);
        assert!(plant.lines().iter().all(|l| l.plant() == plant.id()));
        assert_eq!(plant.line(2).map(|l| l.index()), Some(2));
        assert_eq!(plant.line(3), None);
    }

    #[test]
    fn test_horizon_days() {
        let horizon = Horizon::weeks(5);
        assert_eq!(horizon.len(), 35);
        assert_eq!(horizon.days().next(), Some(Day::new(1)));
        assert_eq!(horizon.last(), Some(Day::new(35)));
        assert!(horizon.contains(Day::new(35)));
        assert!(!horizon.contains(Day::new(0)));
        assert!(!horizon.contains(Day::new(36)));
    }

    #[test]
    fn test_day_previous() {
        assert_eq!(Day::new(1).previous(), None);
        assert_eq!(Day::new(4).previous(), Some(Day::new(3)));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Product::new(3).to_string(), "Product3");
        assert_eq!(PlantId::new(1).to_string(), "P1");
        assert_eq!(Day::new(12).to_string(), "12");
    }
}
