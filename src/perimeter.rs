use crate::claim::{Claim, ClaimBounds};
use crate::types::WorldCoordinate;
use std::iter::FusedIterator;

/// Vertical-edge wireframe of a claim's footprint.
///
/// First every `x` of the box contributes its four `(y, z)` corners, then every
/// `z` strictly between the two z faces contributes the four `(x, y)` corners.
/// The iterator is `Clone`, so a sequence can be replayed from any point.
pub fn edges(claim: &Claim) -> Edges {
    Edges::new(claim.bounds())
}

#[derive(Debug, Clone)]
pub struct Edges {
    bounds: ClaimBounds,
    along_x: u64,
    next: u64,
    len: u64,
}

impl Edges {
    pub fn new(bounds: ClaimBounds) -> Self {
        let along_x = 4 * (bounds.max_x.abs_diff(bounds.min_x) as u64 + 1);
        let inner_z = (bounds.max_z.abs_diff(bounds.min_z) as u64).saturating_sub(1);
        Self {
            bounds,
            along_x,
            next: 0,
            len: along_x + 4 * inner_z,
        }
    }

    fn at(&self, i: u64) -> WorldCoordinate {
        let b = &self.bounds;
        let cell = |x: i32, y: i32, z: i32| WorldCoordinate::new(b.world, x, y, z);
        if i < self.along_x {
            let x = b.min_x + (i / 4) as i32;
            match i % 4 {
                0 => cell(x, b.min_y, b.min_z),
                1 => cell(x, b.min_y, b.max_z),
                2 => cell(x, b.max_y, b.min_z),
                _ => cell(x, b.max_y, b.max_z),
            }
        } else {
            let j = i - self.along_x;
            let z = b.min_z + 1 + (j / 4) as i32;
            match j % 4 {
                0 => cell(b.min_x, b.min_y, z),
                1 => cell(b.min_x, b.max_y, z),
                2 => cell(b.max_x, b.min_y, z),
                _ => cell(b.max_x, b.max_y, z),
            }
        }
    }
}

impl Iterator for Edges {
    type Item = WorldCoordinate;

    fn next(&mut self) -> Option<WorldCoordinate> {
        if self.next >= self.len {
            return None;
        }
        let cell = self.at(self.next);
        self.next += 1;
        Some(cell)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.len - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Edges {}

impl FusedIterator for Edges {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claim::ClaimId;
    use crate::types::{OverlayKind, WorldId};
    use std::collections::HashMap;

    const OVERWORLD: WorldId = WorldId(0);

    fn claim(a: (i32, i32, i32), b: (i32, i32, i32)) -> Claim {
        Claim::between(ClaimId(1), OVERWORLD, a, b, OverlayKind(0))
    }

    fn multiset(cells: impl Iterator<Item = WorldCoordinate>) -> HashMap<(i32, i32, i32), usize> {
        let mut counts = HashMap::new();
        for cell in cells {
            *counts.entry((cell.x, cell.y, cell.z)).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn test_flat_square_outline() {
        let cells: Vec<_> = edges(&claim((0, 0, 0), (2, 0, 2))).collect();

        // y is flat, so every corner pair collapses onto one cell and each
        // outline cell comes out exactly twice.
        assert_eq!(cells.len(), 16);
        let counts = multiset(cells.into_iter());
        let expected = [
            (0, 0, 0),
            (1, 0, 0),
            (2, 0, 0),
            (0, 0, 2),
            (1, 0, 2),
            (2, 0, 2),
            (0, 0, 1),
            (2, 0, 1),
        ];
        assert_eq!(counts.len(), expected.len());
        for cell in expected {
            assert_eq!(counts.get(&cell), Some(&2), "cell {:?}", cell);
        }
        assert!(!counts.contains_key(&(1, 0, 1)));
    }

    #[test]
    fn test_order_and_exact_cells_with_height() {
        let cells: Vec<_> = edges(&claim((2, 70, 1), (0, 60, 0)))
            .map(|c| (c.x, c.y, c.z))
            .collect();
        assert_eq!(
            cells,
            vec![
                (0, 60, 0),
                (0, 60, 1),
                (0, 70, 0),
                (0, 70, 1),
                (1, 60, 0),
                (1, 60, 1),
                (1, 70, 0),
                (1, 70, 1),
                (2, 60, 0),
                (2, 60, 1),
                (2, 70, 0),
                (2, 70, 1),
            ]
        );
    }

    #[test]
    fn test_distinct_heights_have_no_duplicates() {
        let cells: Vec<_> = edges(&claim((0, 60, 0), (4, 70, 3))).collect();
        let counts = multiset(cells.iter().copied());
        assert_eq!(cells.len(), 4 * 5 + 4 * 2);
        assert_eq!(counts.len(), cells.len());
    }

    #[test]
    fn test_single_cell_claim() {
        let cells: Vec<_> = edges(&claim((5, 64, 5), (5, 64, 5))).collect();
        assert_eq!(cells.len(), 4);
        assert!(cells.iter().all(|c| (c.x, c.y, c.z) == (5, 64, 5)));
    }

    #[test]
    fn test_restartable_and_exact_size() {
        let mut edges = edges(&claim((0, 0, 0), (3, 5, 3)));
        assert_eq!(edges.len(), 16 + 8);
        let replay = edges.clone();
        edges.next();
        assert_eq!(edges.len(), 23);
        assert_eq!(replay.count(), 24);
        assert_eq!(edges.by_ref().count(), 23);
        assert_eq!(edges.next(), None);
    }
}
