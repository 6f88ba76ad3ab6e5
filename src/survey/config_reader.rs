use crate::survey::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "surveyName")]
    pub survey_name: String,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "surveyDate")]
    pub survey_date: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub survey: String,
    pub date: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    pub delimiter: Option<String>,
}

impl FileSource {
    pub fn delimiter_byte(&self) -> SurveyResult<u8> {
        match self.delimiter.as_deref() {
            None => Ok(b','),
            Some(d) if d.len() == 1 => Ok(d.as_bytes()[0]),
            Some(d) => InvalidDelimiterSnafu { delimiter: d }.fail(),
        }
    }
}

/// The names of the columns holding each survey field in the source.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub city: Option<String>,
    pub age: String,
    pub gender: String,
    pub vote: String,
    pub satisfaction: String,
    pub concern: String,
}

impl ColumnMapping {
    /// The layout of the electoral panel questionnaire: p1 to p6.
    pub fn electoral_panel() -> ColumnMapping {
        ColumnMapping {
            city: Some("p1".to_string()),
            age: "p2".to_string(),
            gender: "p3".to_string(),
            vote: "p4".to_string(),
            satisfaction: "p5".to_string(),
            concern: "p6".to_string(),
        }
    }

    /// The column of the prepared table that holds a survey field.
    pub fn resolve(&self, field: &str) -> SurveyResult<String> {
        match field {
            "city" => self.city.clone().context(UnknownFieldSnafu { field }),
            "age" => Ok(self.age.clone()),
            "gender" => Ok(self.gender.clone()),
            "vote" => Ok(self.vote.clone()),
            "satisfaction" => Ok(self.satisfaction.clone()),
            "concern" => Ok(self.concern.clone()),
            "ageBracket" => Ok(AGE_BRACKET_FIELD.to_string()),
            _ => UnknownFieldSnafu { field }.fail(),
        }
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        ColumnMapping::electoral_panel()
    }
}

/// Known categories of the survey fields.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Domains {
    pub vote: Option<Vec<String>>,
    pub satisfaction: Option<Vec<String>>,
    pub gender: Option<Vec<String>>,
    pub city: Option<Vec<String>>,
}

impl Domains {
    pub fn for_field(&self, field: &str) -> Option<Vec<String>> {
        match field {
            "vote" => self.vote.clone(),
            "satisfaction" => self.satisfaction.clone(),
            "gender" => self.gender.clone(),
            "city" => self.city.clone(),
            "ageBracket" => Some(AgeBracket::labels()),
            _ => None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FilterSpec {
    pub field: String,
    pub value: String,
    pub group: Option<String>,
}

impl FilterSpec {
    pub fn group_field(&self) -> &str {
        self.group.as_deref().unwrap_or(DEFAULT_GROUP)
    }

    /// Parses a `FIELD=VALUE` argument. The value may contain `=`.
    pub fn parse_arg(arg: &str) -> SurveyResult<FilterSpec> {
        let (field, value) = arg.split_once('=').context(InvalidFilterSnafu { arg })?;
        ensure!(!field.trim().is_empty(), InvalidFilterSnafu { arg });
        Ok(FilterSpec {
            field: field.trim().to_string(),
            value: value.to_string(),
            group: None,
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    pub source: Option<FileSource>,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub domains: Domains,
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
}

impl SurveyConfig {
    /// The configuration used when only an input file is given.
    pub fn for_input(input: &str) -> SurveyConfig {
        SurveyConfig {
            output_settings: OutputSettings {
                survey_name: simplify_file_name(input),
                output_directory: None,
                survey_date: None,
            },
            source: None,
            columns: ColumnMapping::default(),
            domains: Domains::default(),
            filters: vec![],
        }
    }
}

pub fn read_config(path: &str) -> SurveyResult<SurveyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: SurveyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> SurveyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let js = r#"{
            "outputSettings": { "surveyName": "test" },
            "source": { "provider": "csv", "filePath": "a.csv" }
        }"#;
        let config: SurveyConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.columns, ColumnMapping::electoral_panel());
        assert_eq!(config.domains, Domains::default());
        assert!(config.filters.is_empty());
        let source = config.source.unwrap();
        assert_eq!(source.delimiter_byte().unwrap(), b',');
    }

    #[test]
    fn parse_columns_without_city() {
        let js = r#"{
            "outputSettings": { "surveyName": "test" },
            "columns": { "age": "edad", "gender": "genero", "vote": "voto",
                         "satisfaction": "satisfaccion", "concern": "problema" },
            "domains": { "vote": ["A", "B"] }
        }"#;
        let config: SurveyConfig = serde_json::from_str(js).unwrap();
        assert_eq!(config.columns.resolve("vote").unwrap(), "voto");
        assert_eq!(config.columns.resolve("ageBracket").unwrap(), AGE_BRACKET_FIELD);
        assert!(matches!(
            config.columns.resolve("city"),
            Err(SurveyError::UnknownField { .. })
        ));
        assert!(config.columns.resolve("income").is_err());
        assert_eq!(
            config.domains.for_field("vote"),
            Some(vec!["A".to_string(), "B".to_string()])
        );
        assert_eq!(config.domains.for_field("ageBracket"), Some(AgeBracket::labels()));
        assert_eq!(config.domains.for_field("concern"), None);
    }

    #[test]
    fn delimiters() {
        let mut source = FileSource {
            provider: "csv".to_string(),
            file_path: "a.csv".to_string(),
            excel_worksheet_name: None,
            delimiter: Some(";".to_string()),
        };
        assert_eq!(source.delimiter_byte().unwrap(), b';');
        source.delimiter = Some(";;".to_string());
        assert!(source.delimiter_byte().is_err());
    }

    #[test]
    fn filter_arguments() {
        let f = FilterSpec::parse_arg("city=Rivera").unwrap();
        assert_eq!(f.field, "city");
        assert_eq!(f.value, "Rivera");
        assert_eq!(f.group_field(), "vote");
        let f = FilterSpec::parse_arg("concern=a=b").unwrap();
        assert_eq!(f.value, "a=b");
        assert!(FilterSpec::parse_arg("city").is_err());
        assert!(FilterSpec::parse_arg("=Rivera").is_err());
    }
}
