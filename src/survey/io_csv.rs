// Primitives for reading CSV files.

use crate::survey::*;

use survey_tally::builder::TableBuilder;

/// Reads a CSV file with the column names in the first row.
///
/// Cells are kept as text, without trimming. Empty cells are missing values.
/// Lines may have fewer cells than the header.
pub fn read_csv_table(path: &str, cfs: &FileSource) -> BSurveyResult<Table> {
    let delimiter = cfs.delimiter_byte()?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)
        .context(OpeningCsvSnafu { path })?;

    let header: Vec<String> = rdr
        .headers()
        .context(CsvLineParseSnafu { lineno: 1_usize })?
        .iter()
        .map(|s| s.to_string())
        .collect();
    debug!("read_csv_table: header: {:?}", header);

    let mut builder = TableBuilder::new(&header);
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_csv_table: lineno: {:?} row: {:?}", lineno, line);
        builder.add_cells(line.iter().map(Cell::from).collect());
    }
    info!("read_csv_table: {} rows read from {:?}", builder.num_rows(), path);
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source(delimiter: Option<&str>) -> FileSource {
        FileSource {
            provider: "csv".to_string(),
            file_path: "unused.csv".to_string(),
            excel_worksheet_name: None,
            delimiter: delimiter.map(|s| s.to_string()),
        }
    }

    fn write_temp(name: &str, contents: &str) -> String {
        let p = std::env::temp_dir().join(format!("surveytally-{}-{}", std::process::id(), name));
        let mut f = fs::File::create(&p).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        p.display().to_string()
    }

    #[test]
    fn read_simple_csv() {
        let path = write_temp("simple.csv", "p1, p2 ,p3\nRivera,25,F\nArtigas,,M\nSalto\n");
        let table = read_csv_table(&path, &source(None)).unwrap();
        assert_eq!(table.columns, vec!["p1", " p2 ", "p3"]);
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.rows[0][1], Cell::Text("25".to_string()));
        assert_eq!(table.rows[1][1], Cell::Empty);
        assert_eq!(table.rows[2].len(), 1);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn read_semicolon_csv() {
        let path = write_temp("semicolon.csv", "a;b\n1;x\n");
        let table = read_csv_table(&path, &source(Some(";"))).unwrap();
        assert_eq!(table.columns, vec!["a", "b"]);
        assert_eq!(table.rows[0][1], Cell::Text("x".to_string()));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn missing_csv_file() {
        let res = read_csv_table("/nonexistent/surveytally.csv", &source(None));
        assert!(matches!(res.map_err(|e| *e), Err(SurveyError::OpeningCsv { .. })));
    }
}
