//! Schema and type checks that turn a [`RawTable`] into a [`FlowTable`].

use std::path::Path;

use emergy_core::error::{EmergyError, Result};
use emergy_core::models::{
    FlowRecord, FlowTable, COL_AMOUNT, COL_CATEGORY, COL_FLOW_DIRECTION, COL_FLOW_NAME, COL_UEV,
    COL_UNIT, REQUIRED_COLUMNS,
};
use tracing::{debug, warn};

use crate::reader::{read_raw_table, CellValue, RawTable};

/// Offset between a data row's position and its line in the file
/// (one header line, 1-based numbering).
const FILE_LINE_OFFSET: usize = 2;

/// Positions of the six required columns within a [`RawTable`].
struct ColumnIndex {
    flow_name: usize,
    amount: usize,
    unit: usize,
    flow_direction: usize,
    uev: usize,
    category: usize,
}

// ── FlowTableValidator ────────────────────────────────────────────────────────

/// Stateless validator for uploaded flow tables.
pub struct FlowTableValidator;

impl FlowTableValidator {
    /// Validate `raw` and convert it into a canonical [`FlowTable`].
    ///
    /// Checks, in order:
    /// 1. All required columns are present (headers are trimmed first).
    /// 2. Every `Amount` cell is numeric or blank.
    /// 3. Every row whose direction is not exactly `"Output"` has a numeric
    ///    `UEV`. A non-numeric cell anywhere in that subset is
    ///    [`EmergyError::InvalidUev`]; otherwise blank cells are reported as
    ///    [`EmergyError::MissingUev`] with their file line numbers.
    ///
    /// Row order and count are preserved.
    pub fn validate(mut raw: RawTable) -> Result<FlowTable> {
        Self::normalize_headers(&mut raw);
        let columns = Self::resolve_columns(&raw)?;

        let amounts = Self::coerce_amounts(&raw, columns.amount)?;
        let uevs = Self::coerce_uevs(&raw, &columns)?;

        let records: Vec<FlowRecord> = raw
            .rows
            .iter()
            .zip(amounts)
            .zip(uevs)
            .map(|((row, amount), uev)| FlowRecord {
                flow_name: row[columns.flow_name].as_text(),
                amount,
                unit: row[columns.unit].as_text(),
                flow_direction: row[columns.flow_direction].as_text(),
                uev,
                category: row[columns.category].as_text(),
            })
            .collect();

        debug!("Validated flow table with {} rows", records.len());
        Ok(FlowTable::new(records))
    }

    // ── Steps ─────────────────────────────────────────────────────────────────

    fn normalize_headers(raw: &mut RawTable) {
        for header in raw.headers.iter_mut() {
            *header = header.trim_start_matches('\u{feff}').trim().to_string();
        }
    }

    fn resolve_columns(raw: &RawTable) -> Result<ColumnIndex> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| raw.column_index(col).is_none())
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            warn!("Flow table is missing columns: {:?}", missing);
            return Err(EmergyError::MissingColumns(missing));
        }

        // Every lookup below succeeds after the check above.
        let index = |name: &str| raw.column_index(name).unwrap_or_default();
        Ok(ColumnIndex {
            flow_name: index(COL_FLOW_NAME),
            amount: index(COL_AMOUNT),
            unit: index(COL_UNIT),
            flow_direction: index(COL_FLOW_DIRECTION),
            uev: index(COL_UEV),
            category: index(COL_CATEGORY),
        })
    }

    /// The whole column must coerce; one bad cell rejects the table.
    fn coerce_amounts(raw: &RawTable, amount_col: usize) -> Result<Vec<Option<f64>>> {
        raw.rows
            .iter()
            .map(|row| {
                row[amount_col].as_number().map_err(|text| {
                    debug!("Non-numeric Amount cell: {:?}", text);
                    EmergyError::InvalidAmount
                })
            })
            .collect()
    }

    /// UEVs for every row; only rows not literally `"Output"` are checked.
    fn coerce_uevs(raw: &RawTable, columns: &ColumnIndex) -> Result<Vec<Option<f64>>> {
        let mut uevs = Vec::with_capacity(raw.rows.len());
        let mut invalid = false;
        let mut missing_lines = Vec::new();

        for (position, row) in raw.rows.iter().enumerate() {
            let cell = &row[columns.uev];
            if Self::is_literal_output(&row[columns.flow_direction]) {
                uevs.push(cell.as_number().ok().flatten());
                continue;
            }
            match cell.as_number() {
                Ok(Some(v)) => uevs.push(Some(v)),
                Ok(None) => {
                    missing_lines.push(position + FILE_LINE_OFFSET);
                    uevs.push(None);
                }
                Err(text) => {
                    debug!("Non-numeric UEV cell: {:?}", text);
                    invalid = true;
                    uevs.push(None);
                }
            }
        }

        if invalid {
            return Err(EmergyError::InvalidUev);
        }
        if !missing_lines.is_empty() {
            return Err(EmergyError::MissingUev {
                lines: missing_lines,
            });
        }
        Ok(uevs)
    }

    fn is_literal_output(cell: &CellValue) -> bool {
        matches!(cell, CellValue::Text(s) if s == "Output")
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read and validate a flow table file in one step.
pub fn parse_flow_file(path: &Path) -> Result<FlowTable> {
    let raw = read_raw_table(path)?;
    FlowTableValidator::validate(raw)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use emergy_core::error::ErrorKind;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const HEADER: &str = "Flow Name,Amount,Unit,Flow Direction,UEV,Category";

    fn write_csv(dir: &TempDir, lines: &[&str]) -> PathBuf {
        let path = dir.path().join("flows.csv");
        let mut content = String::new();
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    fn parse(lines: &[&str]) -> Result<FlowTable> {
        let dir = TempDir::new().unwrap();
        parse_flow_file(&write_csv(&dir, lines))
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    // ── Happy path ────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_flow_file_valid() {
        let table = parse(&[HEADER, "Water,100,L,Input,2.5,R", "Energy,200,kWh,Input,1.2,F"])
            .unwrap();
        assert_eq!(table.len(), 2);
        let first = &table.records()[0];
        assert_eq!(first.flow_name, "Water");
        assert_eq!(first.amount, Some(100.0));
        assert_eq!(first.uev, Some(2.5));
        assert_eq!(first.category, "R");
    }

    #[test]
    fn test_headers_are_trimmed_and_extra_columns_ignored() {
        let table = parse(&[
            " Flow Name , Amount ,Unit,Flow Direction , UEV,Category,Notes",
            "Water,100,L,Input,2.5,R,whatever",
        ])
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0].amount, Some(100.0));
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let table = parse(&[
            "Category,UEV,Flow Direction,Unit,Amount,Flow Name",
            "N,1e7,Input,kg,2,Steel",
        ])
        .unwrap();
        let record = &table.records()[0];
        assert_eq!(record.flow_name, "Steel");
        assert_eq!(record.emergy(), Some(2e7));
    }

    #[test]
    fn test_output_rows_are_exempt_from_uev_check() {
        let table = parse(&[
            HEADER,
            "Electricity,10,MJ,Input,1e5,F",
            "CO2,20,kg,Output,,F",
            "Waste,5,kg,Output,n.a.,F",
        ])
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.records()[1].uev, None);
        assert_eq!(table.records()[2].uev, None);
    }

    #[test]
    fn test_blank_amount_is_accepted() {
        let table = parse(&[HEADER, "Water,,L,Input,2.5,R"]).unwrap();
        assert_eq!(table.records()[0].amount, None);
    }

    #[test]
    fn test_validate_raw_table_directly() {
        let raw = RawTable::new(
            REQUIRED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            vec![vec![
                text("Sun"),
                CellValue::Number(1.0),
                text("J"),
                text("Input"),
                CellValue::Number(1.0),
                text("r"),
            ]],
        );
        let table = FlowTableValidator::validate(raw).unwrap();
        assert_eq!(table.records()[0].category, "r");
        assert!(table.records()[0].is_input());
    }

    // ── Failures ──────────────────────────────────────────────────────────────

    #[test]
    fn test_missing_columns_names_exact_set() {
        let err = parse(&["Flow Name,Amount,Unit,Flow Direction", "Water,100,L,Input"]).unwrap_err();
        match &err {
            EmergyError::MissingColumns(cols) => {
                assert_eq!(cols, &vec!["UEV".to_string(), "Category".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("UEV"));
        assert!(err.to_string().contains("Category"));
    }

    #[test]
    fn test_missing_only_uev_column() {
        let err = parse(&[
            "Flow Name,Amount,Unit,Flow Direction,Category",
            "Water,100,L,Input,R",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingColumns);
        assert_eq!(err.to_string(), "Missing required columns: UEV");
    }

    #[test]
    fn test_column_names_are_case_sensitive() {
        let err = parse(&[
            "flow name,Amount,Unit,Flow Direction,UEV,Category",
            "Water,100,L,Input,2.5,R",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingColumns);
    }

    #[test]
    fn test_invalid_amount_rejects_whole_table() {
        let err = parse(&[HEADER, "Water,invalid_value,L,Input,2.5,R", "Energy,200,kWh,Input,1.2,F"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    }

    #[test]
    fn test_invalid_amount_on_output_row_still_rejects() {
        let err = parse(&[HEADER, "Water,100,L,Input,2.5,R", "CO2,lots,kg,Output,,F"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    }

    #[test]
    fn test_missing_uev_reports_file_line() {
        let err = parse(&[HEADER, "Water,100,L,Input,,R", "Energy,200,kWh,Input,1.2,F"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingUev);
        assert!(err.to_string().contains('2'));
        match err {
            EmergyError::MissingUev { lines } => assert_eq!(lines, vec![2]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_uev_lists_every_line() {
        let err = parse(&[
            HEADER,
            "Water,100,L,Input,2.5,R",
            "Energy,200,kWh,Input,,F",
            "CO2,20,kg,Output,,F",
            "Sand,3,kg,Unknown,,N",
        ])
        .unwrap_err();
        match err {
            EmergyError::MissingUev { lines } => assert_eq!(lines, vec![3, 5]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_lowercase_output_still_needs_uev() {
        let err = parse(&[HEADER, "Water,100,L,Input,2.5,R", "CO2,20,kg,output,,F"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingUev);
    }

    #[test]
    fn test_invalid_uev_takes_precedence_over_missing() {
        let err = parse(&[
            HEADER,
            "Water,100,L,Input,,R",
            "Energy,200,kWh,Input,invalid_value,F",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUev);
    }

    #[test]
    fn test_missing_columns_checked_before_amount() {
        let err = parse(&["Flow Name,Amount", "Water,abc"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingColumns);
    }

    // ── Spreadsheets ──────────────────────────────────────────────────────────

    enum Cell<'a> {
        Str(&'a str),
        Num(f64),
        Blank,
    }

    fn write_xlsx(dir: &TempDir, rows: &[&[Cell]]) -> PathBuf {
        let path = dir.path().join("flows.xlsx");
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match cell {
                    Cell::Str(s) => {
                        sheet.write(r, c, *s).unwrap();
                    }
                    Cell::Num(n) => {
                        sheet.write(r, c, *n).unwrap();
                    }
                    Cell::Blank => {}
                }
            }
        }
        workbook.save(&path).unwrap();
        path
    }

    fn xlsx_header() -> [Cell<'static>; 6] {
        [
            Cell::Str("Flow Name"),
            Cell::Str("Amount"),
            Cell::Str("Unit"),
            Cell::Str("Flow Direction"),
            Cell::Str("UEV"),
            Cell::Str("Category"),
        ]
    }

    #[test]
    fn test_parse_flow_file_xlsx() {
        use Cell::*;
        let dir = TempDir::new().unwrap();
        let path = write_xlsx(
            &dir,
            &[
                &xlsx_header(),
                &[Str("Water"), Num(100.0), Str("L"), Str("Input"), Num(2.5), Str("R")],
                &[Str("Energy"), Num(200.0), Str("kWh"), Str("Input"), Str("1.2"), Str("F")],
                &[Str("CO2"), Num(3.0), Str("kg"), Str("Output"), Blank, Str("F")],
            ],
        );

        let table = parse_flow_file(&path).unwrap();

        assert_eq!(table.len(), 3);
        let water = &table.records()[0];
        assert_eq!(water.flow_name, "Water");
        assert_eq!(water.amount, Some(100.0));
        assert_eq!(water.unit, "L");
        assert_eq!(water.flow_direction, "Input");
        assert_eq!(water.uev, Some(2.5));
        assert_eq!(water.category, "R");
        // Numeric text in a string cell still coerces.
        assert_eq!(table.records()[1].uev, Some(1.2));
        assert_eq!(table.records()[2].uev, None);
        assert!(table.records()[2].is_literal_output());
    }

    #[test]
    fn test_parse_flow_file_xlsx_missing_uev_line() {
        use Cell::*;
        let dir = TempDir::new().unwrap();
        let path = write_xlsx(
            &dir,
            &[
                &xlsx_header(),
                &[Str("Water"), Num(100.0), Str("L"), Str("Input"), Blank, Str("R")],
                &[Str("Energy"), Num(200.0), Str("kWh"), Str("Input"), Num(1.2), Str("F")],
            ],
        );

        match parse_flow_file(&path).unwrap_err() {
            EmergyError::MissingUev { lines } => assert_eq!(lines, vec![2]),
            other => panic!("expected MissingUev, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_flow_file_xlsx_missing_columns() {
        use Cell::*;
        let dir = TempDir::new().unwrap();
        let path = write_xlsx(
            &dir,
            &[
                &[Str("Flow Name"), Str("Amount"), Str("Unit")],
                &[Str("Water"), Num(100.0), Str("L")],
            ],
        );

        match parse_flow_file(&path).unwrap_err() {
            EmergyError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["Flow Direction", "UEV", "Category"])
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }
}
