use serde::{Deserialize, Serialize};

/// Which header axis a group model belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    Column,
    Row,
}

/// Inclusive range of visible positions (e.g. the area to repaint).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionRange {
    pub start: usize,
    pub end: usize,
}

impl PositionRange {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    pub fn single(position: usize) -> Self {
        Self { start: position, end: position }
    }

    /// Number of positions covered (never zero)
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, position: usize) -> bool {
        position >= self.start && position <= self.end
    }

    /// Smallest range covering both
    pub fn union(&self, other: &PositionRange) -> PositionRange {
        PositionRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Range spanning every position in the iterator, if any.
    pub fn covering(positions: impl IntoIterator<Item = usize>) -> Option<PositionRange> {
        positions.into_iter().fold(None, |acc, p| match acc {
            None => Some(PositionRange::single(p)),
            Some(r) => Some(r.union(&PositionRange::single(p))),
        })
    }

    /// Clip to `[0, visible_count)`; `None` if nothing remains.
    pub fn clipped(&self, visible_count: usize) -> Option<PositionRange> {
        if visible_count == 0 || self.start >= visible_count {
            return None;
        }
        Some(PositionRange {
            start: self.start,
            end: self.end.min(visible_count - 1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_order() {
        let r = PositionRange::new(7, 3);
        assert_eq!(r, PositionRange { start: 3, end: 7 });
        assert_eq!(r.len(), 5);
    }

    #[test]
    fn test_covering_and_clip() {
        let r = PositionRange::covering([4, 9, 2]).unwrap();
        assert_eq!(r, PositionRange::new(2, 9));
        assert_eq!(r.clipped(5), Some(PositionRange::new(2, 4)));
        assert_eq!(r.clipped(2), None);
        assert_eq!(PositionRange::covering(std::iter::empty()), None);
    }
}
