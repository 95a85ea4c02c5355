//! Column-aligned plain text tables.

use std::fmt::Write;

/// Spaces between two columns.
const GAP: usize = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Align {
    Left,
    Right,
}

#[derive(Clone, Debug)]
pub(crate) struct Cell {
    text: String,
    span: usize,
    align: Align,
}

impl Cell {
    pub(crate) fn left(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: 1,
            align: Align::Left,
        }
    }

    pub(crate) fn right(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: 1,
            align: Align::Right,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::left("")
    }

    /// Makes the cell cover `span` columns.
    #[must_use]
    pub(crate) fn spanning(self, span: usize) -> Self {
        Self {
            span: span.max(1),
            ..self
        }
    }
}

#[derive(Debug)]
enum Row {
    Cells(Vec<Cell>),

    // A line of dashes across the table, optionally with a centered title.
    Rule(Option<String>),
}

/// Rows of cells laid out in aligned columns.
#[derive(Debug, Default)]
pub(crate) struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn row(&mut self, cells: Vec<Cell>) {
        self.rows.push(Row::Cells(cells));
    }

    pub(crate) fn rule(&mut self) {
        self.rows.push(Row::Rule(None));
    }

    pub(crate) fn titled_rule(&mut self, title: impl Into<String>) {
        self.rows.push(Row::Rule(Some(title.into())));
    }

    /// The width of the widest row.
    pub(crate) fn width(&self) -> usize {
        total_width(&self.column_widths())
    }

    #[cfg(test)]
    pub(crate) fn render(&self) -> String {
        self.render_with_width(self.width())
    }

    /// Renders the table, stretching rules to at least `min_width` characters.
    pub(crate) fn render_with_width(&self, min_width: usize) -> String {
        let widths = self.column_widths();
        let rule_width = total_width(&widths).max(min_width);

        let mut output = String::new();

        for row in &self.rows {
            let line = match row {
                Row::Cells(cells) => render_cells(cells, &widths),
                Row::Rule(title) => rule(title.as_deref(), rule_width),
            };

            output.push_str(line.trim_end());
            output.push('\n');
        }

        output
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = Vec::new();

        // Single-column cells first, then widen the last column of any span that does not fit.
        for pass_spans in [false, true] {
            for row in &self.rows {
                let Row::Cells(cells) = row else {
                    continue;
                };

                let mut column = 0_usize;

                for cell in cells {
                    let end = column.saturating_add(cell.span);

                    if widths.len() < end {
                        widths.resize(end, 0);
                    }

                    let text_width = cell.text.chars().count();

                    if cell.span == 1 && !pass_spans {
                        if let Some(width) = widths.get_mut(column) {
                            *width = (*width).max(text_width);
                        }
                    } else if cell.span > 1 && pass_spans {
                        let available = spanned_width(&widths, column, cell.span);

                        if let Some(last) = widths.get_mut(end.saturating_sub(1)) {
                            *last = last.saturating_add(text_width.saturating_sub(available));
                        }
                    }

                    column = end;
                }
            }
        }

        widths
    }
}

fn total_width(widths: &[usize]) -> usize {
    spanned_width(widths, 0, widths.len())
}

fn spanned_width(widths: &[usize], first: usize, span: usize) -> usize {
    let columns = widths.iter().skip(first).take(span);
    let count = columns.len();

    columns
        .sum::<usize>()
        .saturating_add(GAP.saturating_mul(count.saturating_sub(1)))
}

fn render_cells(cells: &[Cell], widths: &[usize]) -> String {
    let mut line = String::new();
    let mut column = 0_usize;

    for cell in cells {
        if column > 0 {
            line.push_str(&" ".repeat(GAP));
        }

        let width = spanned_width(widths, column, cell.span);

        let written = match cell.align {
            Align::Left => write!(line, "{:<width$}", cell.text),
            Align::Right => write!(line, "{:>width$}", cell.text),
        };
        written.expect("writing to a String is infallible");

        column = column.saturating_add(cell.span);
    }

    line
}

fn rule(title: Option<&str>, width: usize) -> String {
    match title {
        None => "-".repeat(width),
        Some(title) => {
            let title = format!(" {title} ");
            let dashes = width.saturating_sub(title.chars().count());
            let right = dashes.div_ceil(2);

            format!(
                "{}{}{}",
                "-".repeat(dashes.saturating_sub(right)),
                title,
                "-".repeat(right)
            )
        }
    }
}

/// Formats a value with five significant digits, switching to scientific notation for very
/// large and very small magnitudes.
pub(crate) fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    if !value.is_finite() {
        return value.to_string();
    }

    let magnitude = value.abs().log10().floor();

    if (-4.0..5.0).contains(&magnitude) {
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "magnitude is within -4..5 so the result is within 0..=8"
        )]
        let decimals = (4.0 - magnitude) as usize;

        let text = format!("{value:.decimals$}");

        if text.contains('.') {
            text.trim_end_matches('0').trim_end_matches('.').to_string()
        } else {
            text
        }
    } else {
        format!("{value:.4e}")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn columns_align() {
        let mut table = Table::new();
        table.row(vec![Cell::left("a"), Cell::right("1")]);
        table.row(vec![Cell::left("long"), Cell::right("100")]);

        assert_eq!(table.render(), "a       1\nlong  100\n");
    }

    #[test]
    fn spanned_cell_widens_last_column() {
        let mut table = Table::new();
        table.row(vec![Cell::left("wide heading").spanning(2)]);
        table.row(vec![Cell::left("a"), Cell::left("b")]);

        // 1 + 2 + 9 = 12 characters for the heading.
        assert_eq!(table.width(), 12);
    }

    #[test]
    fn titled_rule_is_centered() {
        let mut table = Table::new();
        table.row(vec![Cell::left("0123456789")]);
        table.titled_rule("ab");

        let rendered = table.render();
        assert_eq!(rendered.lines().nth(1), Some("--- ab ---"));
    }

    #[test]
    fn numbers_use_five_significant_digits() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.234_567), "1.2346");
        assert_eq!(format_number(12_345.6), "12346");
        assert_eq!(format_number(0.001_234_56), "0.0012346");
        assert_eq!(format_number(123_456_789.0), "1.2346e8");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }
}
