pub use crate::config::*;

/// A builder for assembling a survey table row by row.
///
/// ```
/// pub use survey_tally::builder::TableBuilder;
/// pub use survey_tally::{frequency, CategoryOrder};
/// # use survey_tally::AggregationError;
///
/// let mut builder = TableBuilder::new(&["age", "gender", "vote"]);
/// builder.add_row(&["25", "F", "A"]);
/// builder.add_row(&["31", "M", ""]);
/// let table = builder.build();
///
/// let votes = frequency(&table, "vote", &CategoryOrder::ByCount)?;
/// assert_eq!(votes.total, 1);
///
/// # Ok::<(), AggregationError>(())
/// ```
pub struct TableBuilder {
    pub(crate) _columns: Vec<String>,
    pub(crate) _rows: Vec<Vec<Cell>>,
}

impl TableBuilder {
    pub fn new<S: AsRef<str>>(columns: &[S]) -> TableBuilder {
        TableBuilder {
            _columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            _rows: Vec::new(),
        }
    }

    /// Adds a row of raw text values.
    ///
    /// Empty strings become missing values. Nothing is trimmed or parsed:
    /// this is left to `normalize`.
    pub fn add_row<S: AsRef<str>>(&mut self, values: &[S]) {
        let cells = values.iter().map(|v| Cell::from(v.as_ref())).collect();
        self.add_cells(cells);
    }

    /// Adds a row of already typed cells.
    pub fn add_cells(&mut self, cells: Vec<Cell>) {
        self._rows.push(cells);
    }

    /// Chained version of `add_row`.
    pub fn row<S: AsRef<str>>(mut self, values: &[S]) -> TableBuilder {
        self.add_row(values);
        self
    }

    pub fn num_rows(&self) -> usize {
        self._rows.len()
    }

    pub fn build(self) -> Table {
        Table::new(self._columns, self._rows)
    }
}
