use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use survey_tally::*;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;

use crate::survey::config_reader::*;
use crate::survey::io_common::*;

/// The field that filters are grouped by when none is given.
pub const DEFAULT_GROUP: &str = "vote";

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Error opening CSV file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no worksheet or no header row"))]
    EmptyExcel { path: String },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Error reading file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("The CSV delimiter must be a single character, got {delimiter:?}"))]
    InvalidDelimiter { delimiter: String },
    #[snafu(display("Expected a filter of the form FIELD=VALUE, got {arg:?}"))]
    InvalidFilter { arg: String },
    #[snafu(display("Unknown or unmapped survey field {field:?}"))]
    UnknownField { field: String },
    #[snafu(display("Unknown input provider {provider:?}"))]
    UnknownProvider { provider: String },
    #[snafu(display("Aggregation failed: {source}"))]
    Aggregation { source: AggregationError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;
pub type BSurveyResult<T> = Result<T, Box<SurveyError>>;

/// A query from the configuration or the command line, resolved against the table.
#[derive(PartialEq, Debug, Clone)]
pub struct FilterResult {
    pub spec: FilterSpec,
    pub table: FrequencyTable,
}

/// All the statistics of a survey.
#[derive(PartialEq, Debug, Clone)]
pub struct SurveyReport {
    pub loaded: usize,
    pub excluded: usize,
    pub analyzed: usize,
    pub age_brackets: FrequencyTable,
    pub gender: FrequencyTable,
    pub vote: FrequencyTable,
    pub satisfaction: FrequencyTable,
    pub concern: FrequencyTable,
    pub vote_by_gender: CrossTab,
    pub vote_by_age_bracket: CrossTab,
    /// Only when the source has a city column.
    pub vote_by_city: Option<CrossTab>,
    pub filters: Vec<FilterResult>,
}

fn read_table(root: &Path, cfs: &FileSource) -> BSurveyResult<Table> {
    let p = resolve_source_path(root, &cfs.file_path);
    info!("Attempting to read survey file {:?}", p);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_table(&p, cfs),
        "xlsx" => io_excel::read_excel_table(&p, cfs),
        x => Err(Box::new(SurveyError::UnknownProvider {
            provider: x.to_string(),
        })),
    }
}

// The categories a field is aligned on: the declared domain, or else the
// categories of the whole table so that every filter has the same axis.
fn group_domain(
    table: &Table,
    columns: &ColumnMapping,
    domains: &Domains,
    field: &str,
) -> SurveyResult<Vec<String>> {
    if let Some(d) = domains.for_field(field) {
        return Ok(d);
    }
    let column = columns.resolve(field)?;
    let freq = frequency(table, &column, &CategoryOrder::ByCount).context(AggregationSnafu {})?;
    Ok(freq.categories())
}

fn run_filter(
    table: &Table,
    columns: &ColumnMapping,
    domains: &Domains,
    spec: &FilterSpec,
) -> SurveyResult<FilterResult> {
    let filter_column = columns.resolve(&spec.field)?;
    let group_column = columns.resolve(spec.group_field())?;
    let domain = group_domain(table, columns, domains, spec.group_field())?;
    let res = query(table, &filter_column, &spec.value, &group_column, &domain)
        .context(AggregationSnafu {})?;
    debug!("run_filter: {:?}: {:?}", spec, res);
    Ok(FilterResult {
        spec: spec.clone(),
        table: res,
    })
}

/// Computes the statistics of a survey from the raw table.
pub fn tabulate(
    raw: &Table,
    columns: &ColumnMapping,
    domains: &Domains,
    filters: &[FilterSpec],
) -> SurveyResult<SurveyReport> {
    let prepared = prepare_survey(raw, &columns.age).context(AggregationSnafu {})?;
    let table = &prepared.table;
    info!(
        "tabulate: {} answers loaded, {} excluded (invalid age), {} analyzed",
        raw.num_rows(),
        prepared.dropped_rows,
        table.num_rows()
    );
    if prepared.dropped_rows > 0 {
        warn!(
            "{} answers were excluded because their age ({:?}) is not a number",
            prepared.dropped_rows, columns.age
        );
    }

    let by_count = CategoryOrder::ByCount;
    let freq = |column: &str, order: &CategoryOrder| -> SurveyResult<FrequencyTable> {
        frequency(table, column, order).context(AggregationSnafu {})
    };
    let age_brackets = freq(AGE_BRACKET_FIELD, &CategoryOrder::Explicit(AgeBracket::labels()))?;
    let gender = freq(&columns.gender, &by_count)?;
    let vote = freq(&columns.vote, &by_count)?;
    let satisfaction = freq(&columns.satisfaction, &by_count)?;
    let concern = freq(&columns.concern, &by_count)?;

    let vote_domain = domains.for_field("vote");
    let vote_against = |primary_field: &str, primary_column: &str| -> SurveyResult<CrossTab> {
        let d = CrossTabDomains {
            primary: domains.for_field(primary_field),
            secondary: vote_domain.clone(),
        };
        cross_tab(table, primary_column, &columns.vote, &d).context(AggregationSnafu {})
    };
    let vote_by_gender = vote_against("gender", &columns.gender)?;
    let vote_by_age_bracket = vote_against("ageBracket", AGE_BRACKET_FIELD)?;
    let vote_by_city = match &columns.city {
        Some(city) => Some(vote_against("city", city)?),
        None => None,
    };

    let mut filter_results: Vec<FilterResult> = Vec::new();
    for spec in filters.iter() {
        filter_results.push(run_filter(table, columns, domains, spec)?);
    }

    Ok(SurveyReport {
        loaded: raw.num_rows(),
        excluded: prepared.dropped_rows,
        analyzed: table.num_rows(),
        age_brackets,
        gender,
        vote,
        satisfaction,
        concern,
        vote_by_gender,
        vote_by_age_bracket,
        vote_by_city,
        filters: filter_results,
    })
}

fn frequency_to_json(ft: &FrequencyTable) -> JSValue {
    let rows: Vec<JSValue> = ft.rows.iter().map(frequency_row_to_json).collect();
    JSValue::Array(rows)
}

fn frequency_row_to_json(r: &FrequencyRow) -> JSValue {
    json!({"category": r.category, "count": r.count, "percentage": r.percentage})
}

fn cross_tab_to_json(ct: &CrossTab, primary: &str, secondary: &str) -> JSValue {
    let cells: Vec<JSValue> = ct
        .rows
        .iter()
        .map(|r| json!({"primary": r.category_a, "secondary": r.category_b, "count": r.count}))
        .collect();
    json!({
        "primary": primary,
        "secondary": secondary,
        "primaryCategories": ct.categories_a,
        "secondaryCategories": ct.categories_b,
        "cells": cells
    })
}

fn build_summary_js(config: &SurveyConfig, report: &SurveyReport) -> JSValue {
    let c = OutputConfig {
        survey: config.output_settings.survey_name.clone(),
        date: config.output_settings.survey_date.clone(),
    };
    let mut results = json!({
        "ageBrackets": frequency_to_json(&report.age_brackets),
        "gender": frequency_to_json(&report.gender),
        "vote": frequency_to_json(&report.vote),
        "satisfaction": frequency_to_json(&report.satisfaction),
        "concern": frequency_to_json(&report.concern),
        "topVote": report.vote.top().map(frequency_row_to_json),
        "topConcern": report.concern.top().map(frequency_row_to_json),
        "voteByGender": cross_tab_to_json(&report.vote_by_gender, "gender", "vote"),
        "voteByAgeBracket": cross_tab_to_json(&report.vote_by_age_bracket, "ageBracket", "vote"),
    });
    if let Some(ct) = &report.vote_by_city {
        results["voteByCity"] = cross_tab_to_json(ct, "city", "vote");
    }
    let queries: Vec<JSValue> = report
        .filters
        .iter()
        .map(|fr| {
            json!({
                "filter": {"field": fr.spec.field, "value": fr.spec.value},
                "group": fr.spec.group_field(),
                "total": fr.table.total,
                "table": frequency_to_json(&fr.table)
            })
        })
        .collect();
    json!({
        "config": c,
        "responses": {
            "loaded": report.loaded,
            "excluded": report.excluded,
            "analyzed": report.analyzed
        },
        "results": results,
        "queries": queries
    })
}

// Where the summary goes: --out, then the output directory of the
// configuration, then the standard output.
fn output_path(args: &Args, config: &SurveyConfig, root: &Path) -> Option<String> {
    match args.out.as_deref() {
        Some("stdout") => None,
        Some(p) => Some(p.to_string()),
        None => config.output_settings.output_directory.as_ref().map(|dir| {
            let p: PathBuf = root
                .join(dir)
                .join(format!("{}_summary.json", config.output_settings.survey_name));
            p.display().to_string()
        }),
    }
}

/// Runs the tabulation described by the command line arguments and returns the summary.
pub fn run_survey(args: &Args) -> SurveyResult<JSValue> {
    let (config, config_root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => match &args.input {
            Some(input) => (SurveyConfig::for_input(input), PathBuf::new()),
            None => {
                whatever!("No survey to tabulate: pass --config or --input");
            }
        },
    };
    info!("config: {:?}", config);

    // The input from the command line overrides the source of the configuration.
    let (source, source_root) = match (&args.input, &config.source) {
        (Some(input), _) => (
            FileSource {
                provider: args
                    .input_type
                    .clone()
                    .unwrap_or_else(|| provider_for_path(input).to_string()),
                file_path: input.clone(),
                excel_worksheet_name: args.excel_worksheet_name.clone(),
                delimiter: None,
            },
            PathBuf::new(),
        ),
        (None, Some(cfs)) => (cfs.clone(), config_root.clone()),
        (None, None) => {
            whatever!("No source in the configuration: pass --input");
        }
    };

    let raw = read_table(&source_root, &source).map_err(|e| *e)?;

    let mut filters: Vec<FilterSpec> = config.filters.clone();
    for arg in args.filter.iter() {
        filters.push(FilterSpec::parse_arg(arg)?);
    }

    let report = tabulate(&raw, &config.columns, &config.domains, &filters)?;
    debug!("report: {:?}", report);

    // Assemble the final json
    let result_js = build_summary_js(&config, &report);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match output_path(args, &config, &config_root) {
        Some(out_path) => {
            info!("Writing summary to {:?}", out_path);
            fs::write(&out_path, &pretty_js_stats).context(WritingOutputSnafu { path: &out_path })?;
        }
        None => println!("{}", pretty_js_stats),
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary");
        }
    }

    Ok(result_js)
}

#[cfg(test)]
fn run_survey_test(test_name: &str, config_lpath: &str, summary_lpath: &str) -> JSValue {
    let test_dir = option_env!("SURVEY_TEST_DIR").unwrap_or(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/survey_data"
    ));
    info!("Running test {}", test_name);
    let args = Args {
        config: Some(format!("{}/{}/{}", test_dir, test_name, config_lpath)),
        reference: Some(format!("{}/{}/{}", test_dir, test_name, summary_lpath)),
        out: Some("stdout".to_string()),
        ..Args::default()
    };
    match run_survey(&args) {
        Ok(js) => js,
        Err(e) => {
            warn!("Error occured {:?}", e);
            eprintln!("An error occured {}", e);
            if let Some(bt) = snafu::ErrorCompat::backtrace(&e) {
                eprintln!("trace: {}", bt);
            }
            panic!("survey test {} failed: {}", test_name, e);
        }
    }
}

#[cfg(test)]
pub fn test_wrapper(test_name: &str) -> JSValue {
    run_survey_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    )
}
