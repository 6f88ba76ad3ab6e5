use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::survey::*;

use survey_tally::builder::TableBuilder;

/// Reads an Excel workbook. The first row holds the column names.
///
/// The worksheet is the one named in the source, or the first one.
pub fn read_excel_table(path: &str, cfs: &FileSource) -> BSurveyResult<Table> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = match &cfs.excel_worksheet_name {
        Some(name) => workbook
            .worksheet_range(name)
            .context(MissingWorksheetSnafu { name, path })?
            .context(OpeningExcelSnafu { path })?,
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })?,
    };
    range_to_table(&wrange, path)
}

fn range_to_table(wrange: &Range<DataType>, path: &str) -> BSurveyResult<Table> {
    let mut iter = wrange.rows();
    let header = iter.next().context(EmptyExcelSnafu { path })?;
    debug!("read_excel_table: header: {:?}", header);
    let columns: Vec<String> = header
        .iter()
        .map(|c| excel_cell(c).category().unwrap_or_default())
        .collect();

    let mut builder = TableBuilder::new(&columns);
    for (idx, row) in iter.enumerate() {
        debug!("read_excel_table: idx: {:?} row: {:?}", idx, row);
        builder.add_cells(row.iter().map(excel_cell).collect());
    }
    info!(
        "read_excel_table: {} rows read from {:?}",
        builder.num_rows(),
        path
    );
    Ok(builder.build())
}

fn excel_cell(cell: &DataType) -> Cell {
    match cell {
        DataType::String(s) => Cell::from(s.as_str()),
        DataType::Float(f) => Cell::Number(*f),
        DataType::Int(i) => Cell::Number(*i as f64),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        DataType::Empty => Cell::Empty,
        _ => {
            warn!("excel_cell: treating cell {:?} as missing", cell);
            Cell::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_conversion() {
        let mut range: Range<DataType> = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), DataType::String("p1".to_string()));
        range.set_value((0, 1), DataType::String("p2".to_string()));
        range.set_value((0, 2), DataType::String("p3".to_string()));
        range.set_value((1, 0), DataType::String("Rivera".to_string()));
        range.set_value((1, 1), DataType::Float(25.0));
        range.set_value((1, 2), DataType::String("F".to_string()));
        range.set_value((2, 0), DataType::String("Artigas".to_string()));
        range.set_value((2, 1), DataType::Int(61));
        let table = range_to_table(&range, "test.xlsx").unwrap();
        assert_eq!(table.columns, vec!["p1", "p2", "p3"]);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.rows[0][1], Cell::Number(25.0));
        assert_eq!(table.rows[1][1], Cell::Number(61.0));
        assert_eq!(table.rows[1][2], Cell::Empty);
    }

    #[test]
    fn missing_workbook() {
        let source = FileSource {
            provider: "xlsx".to_string(),
            file_path: "unused.xlsx".to_string(),
            excel_worksheet_name: None,
            delimiter: None,
        };
        let res = read_excel_table("/nonexistent/surveytally.xlsx", &source);
        assert!(matches!(res.map_err(|e| *e), Err(SurveyError::OpeningExcel { .. })));
    }
}
