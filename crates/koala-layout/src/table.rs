//! Table layout.
//!
//! [§ 17.5.2.2 Automatic table layout](https://www.w3.org/TR/CSS21/tables.html#auto-table-layout)
//!
//! "Calculate the minimum content width (MCW) of each cell ... Also,
//! calculate the "maximum" cell width of each cell: formatting the content
//! without breaking lines other than where explicit line breaks occur."
//!
//! The wrapper's children are rows and the rows' children are cells; box
//! generation guarantees that shape. Cells span columns but not rows.
//! Spacing separates cells and surrounds the grid
//! ([§ 17.6.1 The separated borders model](https://www.w3.org/TR/CSS21/tables.html#separated-borders)).

use crate::block::WidthRule;
use crate::box_tree::{BlockVariant, BoxId};
use crate::flags::LayoutFlags;
use crate::geometry::ContainingBlock;
use crate::pass::LayoutPass;

/// Minimum and maximum widths of each column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnWidths {
    /// Minimum width per column.
    pub min: Vec<f32>,
    /// Maximum width per column.
    pub max: Vec<f32>,
}

#[allow(clippy::cast_precision_loss)]
impl ColumnWidths {
    fn with_columns(columns: usize) -> Self {
        Self {
            min: vec![0.0; columns],
            max: vec![0.0; columns],
        }
    }

    /// Fold in a cell occupying `span` columns from `column`.
    ///
    /// A spanning cell that needs more than its columns provide spreads
    /// the excess evenly over them.
    pub fn add_cell(&mut self, column: usize, span: usize, min: f32, max: f32, spacing: f32) {
        let end = (column + span.max(1)).min(self.min.len());
        if column >= end {
            return;
        }
        let count = end - column;
        let gaps = spacing * (count - 1) as f32;
        let spread = |widths: &mut [f32], needed: f32| {
            let have: f32 = widths.iter().sum::<f32>() + gaps;
            if needed > have {
                let each = (needed - have) / widths.len() as f32;
                for w in widths {
                    *w += each;
                }
            }
        };
        spread(&mut self.min[column..end], min);
        spread(&mut self.max[column..end], max.max(min));
        for i in column..end {
            self.max[i] = self.max[i].max(self.min[i]);
        }
    }

    /// Sum of the minimum widths plus the spacing around `columns`.
    #[must_use]
    pub fn total_min(&self, spacing: f32) -> f32 {
        self.min.iter().sum::<f32>() + spacing * (self.min.len() + 1) as f32
    }

    /// Sum of the maximum widths plus the spacing.
    #[must_use]
    pub fn total_max(&self, spacing: f32) -> f32 {
        self.max.iter().sum::<f32>() + spacing * (self.max.len() + 1) as f32
    }

    /// Used column widths for a table of content width `target`.
    ///
    /// Between the minimum and maximum totals the widths interpolate
    /// linearly; past the maximum the extra is shared in proportion to
    /// the maximum widths.
    #[must_use]
    pub fn distribute(&self, target: f32, spacing: f32) -> Vec<f32> {
        let total_min = self.total_min(spacing);
        let total_max = self.total_max(spacing);
        if target <= total_min {
            return self.min.clone();
        }
        if target < total_max {
            let t = (target - total_min) / (total_max - total_min);
            return self
                .min
                .iter()
                .zip(&self.max)
                .map(|(min, max)| min + (max - min) * t)
                .collect();
        }
        let extra = target - total_max;
        let sum_max: f32 = self.max.iter().sum();
        let count = self.max.len().max(1) as f32;
        self.max
            .iter()
            .map(|max| {
                if sum_max > 0.0 {
                    max + extra * max / sum_max
                } else {
                    max + extra / count
                }
            })
            .collect()
    }
}

struct CellInfo {
    id: BoxId,
    column: usize,
    span: usize,
}

impl LayoutPass<'_> {
    /// Lay out the rows and cells of the table wrapper `table` and narrow
    /// it to its columns.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn layout_table(&mut self, table: BoxId) {
        let Some(b) = self.tree.get(table) else {
            return;
        };
        let available = b.width;
        let definite = b
            .node
            .and_then(|n| self.styles.resolved(n))
            .is_some_and(|r| !r.width.is_auto());
        let spacing = match b.as_block().map(|data| &data.variant) {
            Some(BlockVariant::TableWrapper(data)) => data.spacing,
            _ => self.config.border_spacing,
        };
        let rows = self.tree.children(table);
        let grid: Vec<Vec<CellInfo>> = rows.iter().map(|&row| self.row_cells(row)).collect();
        let columns = grid
            .iter()
            .flatten()
            .map(|cell| cell.column + cell.span)
            .max()
            .unwrap_or(0);

        // STEP 1: Measure the cells.
        let measure_cb = ContainingBlock::with_auto_height(available, 0.0);
        let mut widths = ColumnWidths::with_columns(columns);
        let mut spanning = Vec::new();
        for cell in grid.iter().flatten() {
            let (min, max) = self.measure_cell(cell.id, measure_cb);
            if cell.span > 1 {
                spanning.push((cell.column, cell.span, min, max));
            } else {
                widths.add_cell(cell.column, 1, min, max, spacing);
            }
        }
        for (column, span, min, max) in spanning {
            widths.add_cell(column, span, min, max, spacing);
        }

        // STEP 2: Table and column widths.
        let total_min = widths.total_min(spacing);
        let target = if definite {
            available.max(total_min)
        } else {
            available.min(widths.total_max(spacing)).max(total_min)
        };
        let used = widths.distribute(target, spacing);
        let mut starts = Vec::with_capacity(used.len());
        let mut x = spacing;
        for w in &used {
            starts.push(x);
            x += w + spacing;
        }

        // STEP 3: Cells at their column widths, rows at their tallest cell.
        let cell_cb = ContainingBlock::with_auto_height(target, 0.0);
        let mut baseline = None;
        let row_count = rows.len();
        for (index, (&row, cells)) in rows.iter().zip(&grid).enumerate() {
            let mut row_height = 0.0_f32;
            let mut row_baseline = None::<f32>;
            for cell in cells {
                let end = (cell.column + cell.span).min(used.len());
                let border_box = used[cell.column.min(end)..end].iter().sum::<f32>()
                    + spacing * (end.saturating_sub(cell.column + 1)) as f32;
                if let Some(BlockVariant::TableCell(data)) = self.tree.block_mut(cell.id).map(|d| &mut d.variant) {
                    data.fixed_width = Some(border_box);
                }
                self.layout_independent(cell.id, cell_cb, WidthRule::Fixed(border_box));
                if let Some(c) = self.tree.get_mut(cell.id) {
                    c.offset_h = starts.get(cell.column).copied().unwrap_or(spacing);
                    c.offset_v = 0.0;
                    row_height = row_height.max(c.total_height());
                }
                let cell_baseline = self.baseline_of(cell.id);
                row_baseline = match (row_baseline, cell_baseline) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                };
            }
            // Cells stretch to the row, keeping their content at the top.
            for cell in cells {
                if let Some(c) = self.tree.get_mut(cell.id) {
                    let edges = c.total_height() - c.height;
                    c.height = (row_height - edges).max(c.height);
                }
            }
            if let Some(r) = self.tree.get_mut(row) {
                r.width = target;
                r.height = row_height;
                r.offset_h = 0.0;
                r.clearance = None;
                r.margin.left = 0.0;
                r.margin.right = 0.0;
                r.margin.top = spacing;
                r.margin.bottom = if index + 1 == row_count { spacing } else { 0.0 };
            }
            if index == 0 {
                baseline = Some(spacing + row_baseline.unwrap_or(row_height));
            }
            self.tree.clear_flags(row, LayoutFlags::NEED_REFLOW);
        }

        if let Some(b) = self.tree.get_mut(table) {
            b.width = target;
        }
        if let Some(data) = self.tree.block_mut(table) {
            data.mcw = total_min;
            if let BlockVariant::TableWrapper(table_data) = &mut data.variant {
                table_data.column_widths = used;
                table_data.baseline = baseline.unwrap_or(0.0);
            }
        }
    }

    fn row_cells(&self, row: BoxId) -> Vec<CellInfo> {
        self.tree
            .children(row)
            .into_iter()
            .filter_map(|id| match &self.tree.block(id)?.variant {
                BlockVariant::TableCell(data) => Some(CellInfo {
                    id,
                    column: data.column,
                    span: data.span.max(1),
                }),
                _ => None,
            })
            .collect()
    }

    /// Minimum and preferred border-box widths of `cell`, measured again
    /// only when the cell changed.
    fn measure_cell(&mut self, cell: BoxId, cb: ContainingBlock) -> (f32, f32) {
        let Some(c) = self.tree.get(cell) else {
            return (0.0, 0.0);
        };
        let cached = match c.as_block().map(|data| &data.variant) {
            Some(BlockVariant::TableCell(data)) => data.measured,
            _ => None,
        };
        if let Some(measured) = cached.filter(|_| !c.flags.intersects(LayoutFlags::RELAYOUT)) {
            return measured;
        }
        self.layout_independent(cell, cb, WidthRule::ShrinkToFit);
        let Some(c) = self.tree.get(cell) else {
            return (0.0, 0.0);
        };
        let edges = c.border.horizontal() + c.padding.horizontal();
        let min = c.as_block().map_or(0.0, |data| data.mcw) + edges;
        let max = self.shrink_to(cell).max(min);
        if let Some(BlockVariant::TableCell(data)) = self.tree.block_mut(cell).map(|d| &mut d.variant) {
            data.measured = Some((min, max));
        }
        (min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spanning_cell_spreads_excess_evenly() {
        let mut widths = ColumnWidths::with_columns(2);
        widths.add_cell(0, 1, 20.0, 50.0, 2.0);
        widths.add_cell(1, 1, 20.0, 50.0, 2.0);
        widths.add_cell(0, 2, 62.0, 62.0, 2.0);
        assert_eq!(widths.min, vec![30.0, 30.0]);
        assert_eq!(widths.max, vec![50.0, 50.0]);
    }

    #[test]
    fn distribution_interpolates_between_min_and_max() {
        let widths = ColumnWidths {
            min: vec![10.0, 30.0],
            max: vec![50.0, 70.0],
        };
        // Totals with spacing 0: min 40, max 120.
        assert_eq!(widths.distribute(80.0, 0.0), vec![30.0, 50.0]);
        assert_eq!(widths.distribute(20.0, 0.0), vec![10.0, 30.0]);
        let wide = widths.distribute(240.0, 0.0);
        assert!((wide[0] - 100.0).abs() < 0.01);
        assert!((wide[1] - 140.0).abs() < 0.01);
    }

    #[test]
    fn spacing_surrounds_the_columns() {
        let widths = ColumnWidths {
            min: vec![10.0, 10.0, 10.0],
            max: vec![10.0, 10.0, 10.0],
        };
        assert_eq!(widths.total_min(2.0), 38.0);
    }
}
