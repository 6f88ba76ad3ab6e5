/*!

This is the long-form manual for `survey_tally` and `surveytally`.

## Processing steps

A survey table goes through the following steps:

1. **Normalization** (`normalize`): the column names are trimmed, the age column is
   converted to numbers, and the rows with an age that is not a number are dropped.
   The number of dropped rows is reported, not treated as an error. Infinite
   values (`inf`, `-inf`) and `NaN` count as not a number: those rows are dropped
   rather than placed in `60+`.
2. **Age brackets** (`derive_age_brackets`): every remaining row gets one of
   `18-29`, `30-44`, `45-59`, `60+`. Ages under 18 are counted in `18-29`.
3. **Aggregation**: frequency tables (`frequency`) and cross-tabulations (`cross_tab`).
4. **Queries** (`query`, `query_cross_tab`): the same aggregations restricted to
   the rows matching a value, for example all the answers from one city.

`prepare_survey` runs the first two steps.

## Percentages

Percentages are computed over the non-missing values of the field and rounded
half-to-even at 2 decimals. Each category is rounded on its own: with three
categories of one answer each, the table shows `33.33` three times and sums to
`99.99`. Nothing is redistributed to reach exactly 100.

## Ordering

- frequency tables are sorted by descending count. Categories with the same count
  appear in the order in which they are first met in the table.
- the age brackets are reported in chronological order.
- cross-tabulations without domains are sorted by category names.
- a cross-tabulation with a declared primary domain has a row for every primary
  category. When no secondary category is known (no domain, nothing observed),
  each primary category gets a single row with an empty secondary category and
  a count of 0.
- queries follow the order of the domain that is passed to them.

## Domains

A domain is the list of all the categories that a field may take (all the candidates,
all the satisfaction levels, ...). Aligning a result on a domain makes sure that every
category appears once, with a count of 0 if nobody chose it. This keeps the same axes
for every filter. A filter that matches no answer gives a table of zeros, not an error.

## Input formats

The following formats are supported by `surveytally`:
* `csv` Comma Separated Values, with the column names in the first row
* `xlsx` Excel workbooks (the first worksheet unless a name is given)

### csv

```text
p1,p2,p3,p4,p5,p6
Rivera,25,F,Ana,Satisfecho,Seguridad
Artigas,65,F,Bruno,Neutral,Empleo
```

Empty cells are missing values. A different single-character delimiter can be set
with `delimiter` in the configuration.

### xlsx

The first row holds the column names. Text and number cells are read as is; empty
and error cells are missing values.

## Configuration

`surveytally` reads a configuration file in JSON:

```json
{
  "outputSettings": { "surveyName": "Electoral panel", "outputDirectory": "out" },
  "source": { "provider": "csv", "filePath": "answers.csv" },
  "columns": { "city": "p1", "age": "p2", "gender": "p3", "vote": "p4",
               "satisfaction": "p5", "concern": "p6" },
  "domains": { "vote": ["Ana", "Bruno", "Carla"] },
  "filters": [ { "field": "city", "value": "Rivera", "group": "vote" } ]
}
```

- `columns` (optional) maps the survey fields to the column names of the source. The
  default is the layout above. `city` may be left out.
- `domains` (optional) lists the known categories of `vote`, `satisfaction`, `gender`
  and `city`. Fields without a domain use the categories seen in the whole table.
- `filters` (optional) are the queries to add to the summary. `field` and `group` are
  survey field names (`city`, `gender`, `vote`, `satisfaction`, `concern`,
  `ageBracket`). `group` defaults to `vote`.
- the `filePath` of the source is relative to the configuration file.

 */
