// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The content of one cell of a survey table.
///
/// Loaders produce `Text` and `Number` cells. Missing values are `Empty`,
/// and an empty string read from a file is also treated as `Empty`.
#[derive(PartialEq, Debug, Clone)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    /// The category label of this cell, or None for a missing value.
    ///
    /// Numbers use the shortest float representation (`25.0` becomes `"25"`).
    pub fn category(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(n.to_string()),
        }
    }

    /// Exact, case-sensitive match against a category label.
    /// A missing value never matches.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Cell::Empty => false,
            Cell::Text(s) => s == value,
            Cell::Number(n) => n.to_string() == value,
        }
    }

    /// Numeric coercion. Text is trimmed before parsing.
    /// Empty cells, unparseable text and non-finite values give None.
    pub fn as_number(&self) -> Option<f64> {
        let x = match self {
            Cell::Empty => None,
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Number(n) => Some(*n),
        };
        x.filter(|n| n.is_finite())
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Cell {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Cell {
        Cell::Number(n)
    }
}

pub(crate) static EMPTY_CELL: Cell = Cell::Empty;

/// An in-memory survey table: named columns and positional rows.
///
/// Rows may be shorter than the header; the missing trailing cells read as
/// `Cell::Empty`.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Table {
        Table { columns, rows }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// The position of a column. Fails with `FieldNotFound` if the name is unknown.
    pub fn column_index(&self, name: &str) -> Result<usize, AggregationError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| AggregationError::FieldNotFound {
                field: name.to_string(),
            })
    }

    /// All the cells of a column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>, AggregationError> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| cell_at(row, idx)).collect())
    }
}

pub(crate) fn cell_at(row: &[Cell], idx: usize) -> &Cell {
    row.get(idx).unwrap_or(&EMPTY_CELL)
}

// ********* Derived features ***********

/// The age groups used for reporting.
///
/// The partition is inclusive on the lower bound. There is no floor at 18:
/// any age under 30 falls in `18-29`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum AgeBracket {
    From18To29,
    From30To44,
    From45To59,
    From60,
}

impl AgeBracket {
    /// All the brackets, in chronological order.
    pub const ALL: [AgeBracket; 4] = [
        AgeBracket::From18To29,
        AgeBracket::From30To44,
        AgeBracket::From45To59,
        AgeBracket::From60,
    ];

    pub fn from_age(age: f64) -> AgeBracket {
        if age < 30.0 {
            AgeBracket::From18To29
        } else if age < 45.0 {
            AgeBracket::From30To44
        } else if age < 60.0 {
            AgeBracket::From45To59
        } else {
            AgeBracket::From60
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBracket::From18To29 => "18-29",
            AgeBracket::From30To44 => "30-44",
            AgeBracket::From45To59 => "45-59",
            AgeBracket::From60 => "60+",
        }
    }

    /// The labels of all the brackets, in chronological order.
    pub fn labels() -> Vec<String> {
        AgeBracket::ALL
            .iter()
            .map(|b| b.label().to_string())
            .collect()
    }
}

impl Display for AgeBracket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone)]
pub struct FrequencyRow {
    pub category: String,
    pub count: u64,
    /// Share of the total, in percent, rounded half-to-even at 2 decimals.
    pub percentage: f64,
}

/// The distribution of the values of one field.
///
/// Every percentage is rounded on its own, so the sum may be off 100.00 by
/// up to 0.01 per category. This drift is not corrected.
#[derive(PartialEq, Debug, Clone)]
pub struct FrequencyTable {
    pub field: String,
    /// Number of non-missing values: the denominator of the percentages.
    pub total: u64,
    pub rows: Vec<FrequencyRow>,
}

impl FrequencyTable {
    pub fn categories(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.category.clone()).collect()
    }

    pub fn counts(&self) -> Vec<(String, u64)> {
        self.rows
            .iter()
            .map(|r| (r.category.clone(), r.count))
            .collect()
    }

    pub fn get(&self, category: &str) -> Option<&FrequencyRow> {
        self.rows.iter().find(|r| r.category == category)
    }

    /// The most frequent category. The first one in table order wins a tie.
    /// None when the table is empty or only has zero counts.
    pub fn top(&self) -> Option<&FrequencyRow> {
        let mut best: Option<&FrequencyRow> = None;
        for r in self.rows.iter() {
            match best {
                Some(b) if b.count >= r.count => {}
                _ if r.count > 0 => best = Some(r),
                _ => {}
            }
        }
        best
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CrossTabRow {
    pub category_a: String,
    pub category_b: String,
    pub count: u64,
}

/// Joint counts of two fields.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CrossTab {
    pub field_a: String,
    pub field_b: String,
    /// The categories of the primary field, in output order.
    pub categories_a: Vec<String>,
    /// The categories of the secondary field, in output order.
    pub categories_b: Vec<String>,
    pub rows: Vec<CrossTabRow>,
}

impl CrossTab {
    /// The count of a pair of categories, 0 if the pair is not in the table.
    pub fn count(&self, category_a: &str, category_b: &str) -> u64 {
        self.rows
            .iter()
            .find(|r| r.category_a == category_a && r.category_b == category_b)
            .map(|r| r.count)
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.count).sum()
    }
}

/// Errors that prevent an aggregation from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AggregationError {
    /// The requested column does not exist in the table.
    FieldNotFound { field: String },
}

impl Error for AggregationError {}

impl Display for AggregationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregationError::FieldNotFound { field } => {
                write!(f, "field not found in survey table: {:?}", field)
            }
        }
    }
}

// ********* Configuration **********

/// How the rows of a frequency table are ordered.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum CategoryOrder {
    /// Descending count. Equal counts keep the order in which the
    /// categories first appear in the table.
    ByCount,
    /// The given categories first, in this order. Observed categories that
    /// are not listed follow, by descending count. Listed categories that
    /// are not observed are skipped (see `FrequencyTable::reindex` to keep them).
    Explicit(Vec<String>),
}

/// Declared category domains for a cross-tabulation.
///
/// When one of the domains is set, the cross-tabulation is the full product
/// of the two axes, with zero counts for the pairs that do not occur.
/// An axis without a declared domain uses the observed categories in
/// lexical order.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CrossTabDomains {
    pub primary: Option<Vec<String>>,
    pub secondary: Option<Vec<String>>,
}

impl CrossTabDomains {
    /// Only the observed pairs, in lexical order.
    pub const OBSERVED: CrossTabDomains = CrossTabDomains {
        primary: None,
        secondary: None,
    };
}

/// The column holding the age bracket derived by `prepare_survey`.
pub const AGE_BRACKET_FIELD: &str = "age_bracket";
