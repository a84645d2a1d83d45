//! Depth classification
//!
//! Buckets depression-depth values into ordered, right-exclusive bins.
//! The last bin is open-ended, so any valid depth above the final edge
//! still gets a class. Values that fail the validity predicate (zero,
//! negative, or below the first edge) are masked out rather than
//! classified; they never produce an error.

use log::debug;
use std::fs;
use std::path::Path;

use crate::errors::{StormError, StormResult};
use crate::grid::Grid;

/// Ordered depth bins with one label per bin
///
/// `edges[i]` is the lower edge of bin `i`; bin `i` covers
/// `[edges[i], edges[i+1])` and the last bin covers `[edges[n-1], inf)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBins {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl DepthBins {
    /// Creates bins from edges and labels
    ///
    /// Edges must be strictly increasing, positive, and one per label.
    pub fn new(edges: Vec<f64>, labels: Vec<String>) -> StormResult<Self> {
        if edges.is_empty() || edges.len() != labels.len() {
            return Err(StormError::GenericError(format!(
                "Need one label per bin edge, got {} edges and {} labels",
                edges.len(), labels.len()
            )));
        }
        if edges[0] <= 0.0 {
            return Err(StormError::GenericError(
                "First bin edge must be positive".to_string()));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StormError::GenericError(
                "Bin edges must be strictly increasing".to_string()));
        }
        Ok(DepthBins { edges, labels })
    }

    /// Loads bins from a TOML file with `edges` and `labels` arrays
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> StormResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let value: toml::Value = content.parse()
            .map_err(|e| StormError::GenericError(format!("Invalid bins file: {}", e)))?;

        let edges = value.get("edges")
            .and_then(|v| v.as_array())
            .ok_or_else(|| StormError::GenericError(
                "Bins file is missing an 'edges' array".to_string()))?
            .iter()
            .map(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| StormError::GenericError(
                "Bin edges must be numbers".to_string()))?;

        let labels = value.get("labels")
            .and_then(|v| v.as_array())
            .ok_or_else(|| StormError::GenericError(
                "Bins file is missing a 'labels' array".to_string()))?
            .iter()
            .map(|v| v.as_str().map(String::from))
            .collect::<Option<Vec<String>>>()
            .ok_or_else(|| StormError::GenericError(
                "Bin labels must be strings".to_string()))?;

        debug!("Loaded {} depth bins from file", edges.len());
        Self::new(edges, labels)
    }

    /// Number of bins
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether there are no bins (never true for a constructed value)
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Label of bin `index`
    pub fn label(&self, index: usize) -> &str {
        &self.labels[index]
    }

    /// All labels in bin order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Classifies one value
    ///
    /// Right-exclusive: a value equal to a bin edge belongs to the bin
    /// that edge opens. Returns None for invalid values (<= 0 or below
    /// the first edge).
    pub fn classify(&self, value: f64) -> Option<usize> {
        if !(value > 0.0) || value < self.edges[0] {
            return None;
        }
        let count = self.edges.iter().take_while(|&&edge| value >= edge).count();
        Some(count - 1)
    }

    /// Classifies a whole grid
    ///
    /// Returns per-cell class indices and a validity mask of identical
    /// shape. No-data cells are always masked out.
    pub fn classify_grid(&self, grid: &Grid) -> ClassifiedGrid {
        let rows = grid.rows();
        let cols = grid.cols();
        let mut classes = vec![0usize; rows * cols];
        let mut mask = vec![false; rows * cols];

        for row in 0..rows {
            for col in 0..cols {
                if grid.is_nodata(row, col) {
                    continue;
                }
                if let Some(class) = self.classify(grid.get(row, col)) {
                    let idx = row * cols + col;
                    classes[idx] = class;
                    mask[idx] = true;
                }
            }
        }

        ClassifiedGrid { rows, cols, classes, mask }
    }
}

impl Default for DepthBins {
    /// The standard depression-depth bins in meters
    fn default() -> Self {
        DepthBins {
            edges: vec![0.1, 0.2, 0.5, 1.0],
            labels: vec![
                "0.1-0.2 m".to_string(),
                "0.2-0.5 m".to_string(),
                "0.5-1 m".to_string(),
                "1.0<".to_string(),
            ],
        }
    }
}

/// Per-cell class indices plus the validity mask
#[derive(Debug, Clone)]
pub struct ClassifiedGrid {
    pub rows: usize,
    pub cols: usize,
    /// Class index per cell; meaningless where the mask is false
    pub classes: Vec<usize>,
    /// True where the cell passed the validity predicate
    pub mask: Vec<bool>,
}

impl ClassifiedGrid {
    /// Class of a cell, or None if masked out
    pub fn class_at(&self, row: usize, col: usize) -> Option<usize> {
        let idx = row * self.cols + col;
        if self.mask[idx] {
            Some(self.classes[idx])
        } else {
            None
        }
    }

    /// Number of valid cells
    pub fn valid_count(&self) -> usize {
        self.mask.iter().filter(|&&m| m).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridTransform;

    fn default_bins() -> DepthBins {
        DepthBins::default()
    }

    #[test]
    fn values_below_first_edge_are_invalid() {
        let bins = default_bins();
        assert_eq!(bins.classify(0.0), None);
        assert_eq!(bins.classify(-1.0), None);
        assert_eq!(bins.classify(0.05), None);
        assert_eq!(bins.classify(f64::NAN), None);
    }

    #[test]
    fn bin_edges_are_right_exclusive() {
        let bins = default_bins();
        assert_eq!(bins.classify(0.1), Some(0));
        assert_eq!(bins.classify(0.19999), Some(0));
        assert_eq!(bins.classify(0.2), Some(1));
        assert_eq!(bins.classify(0.5), Some(2));
        assert_eq!(bins.classify(1.0), Some(3));
    }

    #[test]
    fn last_bin_is_open_ended() {
        let bins = default_bins();
        assert_eq!(bins.classify(1.2), Some(3));
        assert_eq!(bins.classify(5000.0), Some(3));
    }

    #[test]
    fn classification_is_monotonic() {
        let bins = default_bins();
        let values = [0.1, 0.15, 0.2, 0.35, 0.5, 0.9, 1.0, 2.5, 100.0];
        let classes: Vec<usize> = values.iter().map(|&v| bins.classify(v).unwrap()).collect();
        assert!(classes.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn edges_must_increase() {
        assert!(DepthBins::new(vec![0.2, 0.1], vec!["a".into(), "b".into()]).is_err());
        assert!(DepthBins::new(vec![0.1, 0.1], vec!["a".into(), "b".into()]).is_err());
        assert!(DepthBins::new(vec![-0.1, 0.1], vec!["a".into(), "b".into()]).is_err());
    }

    #[test]
    fn scenario_grid_classifies_to_known_labels() {
        let bins = default_bins();
        let grid = Grid::new(
            3, 3,
            vec![0.0, 0.15, 0.25, 0.6, 0.8, 1.2, 0.0, 0.0, 0.5],
            GridTransform::new(0.0, 3.0, 1.0, -1.0),
            Some(3006),
            None,
        ).unwrap();

        let classified = bins.classify_grid(&grid);
        assert_eq!(classified.valid_count(), 6);
        assert_eq!(classified.class_at(0, 0), None);
        assert_eq!(classified.class_at(0, 1), Some(0)); // 0.15
        assert_eq!(classified.class_at(0, 2), Some(1)); // 0.25
        assert_eq!(classified.class_at(1, 0), Some(2)); // 0.6
        assert_eq!(classified.class_at(1, 2), Some(3)); // 1.2
        assert_eq!(classified.class_at(2, 2), Some(2)); // 0.5
    }

    #[test]
    fn nodata_cells_are_masked() {
        let bins = default_bins();
        let grid = Grid::new(
            1, 3,
            vec![0.5, -9999.0, 0.3],
            GridTransform::new(0.0, 1.0, 1.0, -1.0),
            None,
            Some(-9999.0),
        ).unwrap();
        let classified = bins.classify_grid(&grid);
        assert_eq!(classified.valid_count(), 2);
        assert_eq!(classified.class_at(0, 1), None);
    }
}
