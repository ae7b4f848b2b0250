// src/output/multipane/layout.rs

//! Region naming and grid placement.

/// Region names in display order: the base region first, then commands in
/// declaration order, each name at most once.
pub fn region_names(base_name: &str, command_names: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(command_names.len() + 1);
    for name in std::iter::once(base_name).chain(command_names.iter().map(String::as_str)) {
        if !unique.iter().any(|n| n == name) {
            unique.push(name.to_string());
        }
    }
    unique
}

/// `(rows, cols)` of a roughly square grid holding `total` regions.
///
/// `cols = ceil(sqrt(total))`, `rows = ceil(total / cols)`, never below 1.
pub fn grid_dimensions(total: usize) -> (usize, usize) {
    if total == 0 {
        return (1, 1);
    }
    let mut cols = 1usize;
    while cols * cols < total {
        cols += 1;
    }
    let rows = total.div_ceil(cols).max(1);
    (rows, cols)
}

/// Row-major `(row, col)` of the region at `index`.
pub fn grid_cell(index: usize, cols: usize) -> (usize, usize) {
    let cols = cols.max(1);
    (index / cols, index % cols)
}

/// Number of regions placed in `row`.
pub fn row_len(row: usize, total: usize, cols: usize) -> usize {
    let start = row * cols;
    total.saturating_sub(start).min(cols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_dimensions_table() {
        let cases = [
            (0, (1, 1)),
            (1, (1, 1)),
            (2, (1, 2)),
            (3, (2, 2)),
            (4, (2, 2)),
            (5, (2, 3)),
            (9, (3, 3)),
            (10, (3, 4)),
        ];
        for (total, expected) in cases {
            assert_eq!(grid_dimensions(total), expected, "total = {total}");
        }
    }

    #[test]
    fn base_region_first_and_deduplicated() {
        let names = vec!["web".to_string(), "procmux".to_string(), "web".to_string(), "db".to_string()];
        assert_eq!(region_names("procmux", &names), vec!["procmux", "web", "db"]);
    }

    #[test]
    fn cells_are_row_major() {
        let (_, cols) = grid_dimensions(5);
        assert_eq!(grid_cell(0, cols), (0, 0));
        assert_eq!(grid_cell(2, cols), (0, 2));
        assert_eq!(grid_cell(3, cols), (1, 0));
        assert_eq!(row_len(0, 5, cols), 3);
        assert_eq!(row_len(1, 5, cols), 2);
    }
}
