use std::collections::BTreeSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::warn;

use crate::domain::{RunId, SampleId};
use crate::error::RetrieveError;

pub const DATA_MARKER: &str = "[Data]";

pub const DATA_COLUMNS: [&str; 10] = [
    "Sample_ID",
    "Sample_Name",
    "Sample_Plate",
    "Sample_Well",
    "I7_Index_ID",
    "index",
    "I5_Index_ID",
    "index2",
    "Sample_Project",
    "Description",
];

const EXPERIMENT_NAME: &str = "Experiment Name";
const DESCRIPTION: &str = "Description";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleSheet {
    pub path: Utf8PathBuf,
    pub run_id: RunId,
    pub declared_sample_ids: BTreeSet<SampleId>,
}

impl SampleSheet {
    pub fn read(path: &Utf8Path) -> Result<Self, RetrieveError> {
        let text = read_text(path)?;
        Self::parse(path, &text)
    }

    pub fn parse(path: &Utf8Path, text: &str) -> Result<Self, RetrieveError> {
        let name = experiment_name_from_text(text).ok_or_else(|| {
            RetrieveError::SampleSheetField {
                path: path.to_path_buf(),
                field: EXPERIMENT_NAME.to_string(),
            }
        })?;
        let run_id = name
            .parse::<RunId>()
            .map_err(|_| RetrieveError::SampleSheetField {
                path: path.to_path_buf(),
                field: EXPERIMENT_NAME.to_string(),
            })?;

        let declared_sample_ids = match DataSection::parse(text) {
            Some(section) => {
                if let Err(detail) = section.validate_header() {
                    warn!(path = %path, %detail, "unexpected {DATA_MARKER} header");
                }
                section.sample_ids()
            }
            None => {
                warn!(path = %path, "sample sheet has no {DATA_MARKER} section");
                BTreeSet::new()
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            run_id,
            declared_sample_ids,
        })
    }
}

/// Reads the run name from the sample sheet header: the second field of the
/// `Experiment Name` line, or of the `Description` line when that is absent.
pub fn extract_experiment_name(path: &Utf8Path) -> Result<String, RetrieveError> {
    let text = read_text(path)?;
    experiment_name_from_text(&text).ok_or_else(|| RetrieveError::SampleSheetField {
        path: path.to_path_buf(),
        field: format!("{EXPERIMENT_NAME}' or '{DESCRIPTION}"),
    })
}

fn experiment_name_from_text(text: &str) -> Option<String> {
    let header = header_lines(text).collect::<Vec<_>>();
    [EXPERIMENT_NAME, DESCRIPTION].into_iter().find_map(|key| {
        header
            .iter()
            .find(|line| line.starts_with(key))
            .map(|line| line.split(',').nth(1).unwrap_or_default().trim().to_string())
    })
}

fn header_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(|line| line.trim_start_matches('\u{feff}'))
        .take_while(|line| !line.trim().starts_with(DATA_MARKER))
}

fn read_text(path: &Utf8Path) -> Result<String, RetrieveError> {
    let bytes = fs::read(path.as_std_path())
        .map_err(|err| RetrieveError::Filesystem(format!("read {path}: {err}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSection {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataSection {
    /// Splits the table that follows the `[Data]` marker into cells.
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text
            .lines()
            .skip_while(|line| !line.trim().starts_with(DATA_MARKER))
            .skip(1)
            .filter(|line| !is_blank_row(line));

        let header = split_row(lines.next()?);
        let header = trim_trailing_empty(header);
        let rows = lines
            .take_while(|line| !line.trim_start().starts_with('['))
            .map(split_row)
            .collect();
        Some(Self { header, rows })
    }

    /// The header must hold exactly the ten expected columns, in any order.
    pub fn validate_header(&self) -> Result<(), String> {
        let found = self.header.iter().map(String::as_str).collect::<BTreeSet<_>>();
        let expected = DATA_COLUMNS.into_iter().collect::<BTreeSet<_>>();
        if found == expected && found.len() == self.header.len() {
            return Ok(());
        }
        let missing = expected.difference(&found).copied().collect::<Vec<_>>();
        let extra = found.difference(&expected).copied().collect::<Vec<_>>();
        Err(format!(
            "missing columns [{}], unexpected columns [{}]",
            missing.join(", "),
            extra.join(", ")
        ))
    }

    pub fn sample_ids(&self) -> BTreeSet<SampleId> {
        let Some(column) = self.header.iter().position(|name| name == "Sample_ID") else {
            return BTreeSet::new();
        };
        self.rows
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|value| !value.is_empty())
            .map(|value| SampleId::from(value.as_str()))
            .collect()
    }
}

fn split_row(line: &str) -> Vec<String> {
    line.split(',').map(|cell| cell.trim().to_string()).collect()
}

fn trim_trailing_empty(mut cells: Vec<String>) -> Vec<String> {
    while cells.last().is_some_and(|cell| cell.is_empty()) {
        cells.pop();
    }
    cells
}

fn is_blank_row(line: &str) -> bool {
    line.split(',').all(|cell| cell.trim().is_empty())
}
