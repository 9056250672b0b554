//! Metadata table backing a dataset.
//!
//! One CSV row per sample; row order defines the sample index. Fixed columns
//! `track`, `northing`, `easting`, plus one filename/timestamp key column per
//! modality (camera name for images and masks, `pointcloud` for lidar).

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::error::{DatasetError, Result};

/// One sample's metadata row.
#[derive(Debug, Clone)]
pub struct TableRow {
    pub track: String,
    pub northing: f64,
    pub easting: f64,
    /// Per-modality payload keys, by column name.
    keys: HashMap<String, String>,
}

impl TableRow {
    /// Payload key for a modality column, e.g. `"pointcloud"` or a camera name.
    pub fn key(&self, column: &str) -> Option<&str> {
        self.keys.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetadataTable {
    rows: Vec<TableRow>,
}

impl MetadataTable {
    pub fn from_csv_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DatasetError::NotFound {
                what: "metadata table",
                path: path.to_path_buf(),
            });
        }
        let reader = csv::Reader::from_path(path)?;
        Self::from_csv(reader)
    }

    pub fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let headers = reader.headers()?.clone();
        let columns: Vec<String> = headers.iter().map(str::to_string).collect();
        for required in ["track", "northing", "easting"] {
            if !columns.iter().any(|c| c == required) {
                return Err(DatasetError::Table {
                    row: 0,
                    message: format!("missing required column {required:?}"),
                });
            }
        }

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let mut track = String::new();
            let mut northing = None;
            let mut easting = None;
            let mut keys = HashMap::new();
            for (column, value) in columns.iter().zip(record.iter()) {
                match column.as_str() {
                    "track" => track = value.to_string(),
                    "northing" => northing = Some(parse_coord(i, column, value)?),
                    "easting" => easting = Some(parse_coord(i, column, value)?),
                    _ => {
                        keys.insert(column.clone(), value.to_string());
                    }
                }
            }
            rows.push(TableRow {
                track,
                northing: northing.ok_or_else(|| missing_value(i, "northing"))?,
                easting: easting.ok_or_else(|| missing_value(i, "easting"))?,
                keys,
            });
        }
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> Result<&TableRow> {
        self.rows.get(idx).ok_or(DatasetError::IndexOutOfRange {
            idx,
            len: self.rows.len(),
        })
    }

    /// (northing, easting) per row, in index order.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        self.rows.iter().map(|r| [r.northing, r.easting]).collect()
    }
}

fn parse_coord(row: usize, column: &str, value: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| DatasetError::Table {
        row,
        message: format!("non-numeric {column}: {value:?}"),
    })
}

fn missing_value(row: usize, column: &str) -> DatasetError {
    DatasetError::Table {
        row,
        message: format!("missing value for {column}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
track,northing,easting,lb3_Cam0,pointcloud
2012-01-08,42.29,-83.71,1326030000,1326030001
2012-01-08,42.30,-83.72,1326030100,1326030101
2012-02-12,45.00,-80.00,1329060000,1329060001
";

    fn table() -> MetadataTable {
        let reader = csv::Reader::from_reader(CSV.as_bytes());
        MetadataTable::from_csv(reader).unwrap()
    }

    #[test]
    fn parses_rows_in_order() {
        let t = table();
        assert_eq!(t.len(), 3);
        let row = t.row(0).unwrap();
        assert_eq!(row.track, "2012-01-08");
        assert_eq!(row.northing, 42.29);
        assert_eq!(row.key("pointcloud"), Some("1326030001"));
        assert_eq!(row.key("lb3_Cam0"), Some("1326030000"));
        assert_eq!(row.key("nonexistent"), None);
    }

    #[test]
    fn out_of_range_row() {
        let t = table();
        assert!(matches!(
            t.row(3),
            Err(DatasetError::IndexOutOfRange { idx: 3, len: 3 })
        ));
    }

    #[test]
    fn positions_follow_row_order() {
        let t = table();
        let pos = t.positions();
        assert_eq!(pos.len(), 3);
        assert_eq!(pos[2], [45.00, -80.00]);
    }

    #[test]
    fn rejects_missing_columns() {
        let reader = csv::Reader::from_reader("track,northing\na,1.0\n".as_bytes());
        assert!(matches!(
            MetadataTable::from_csv(reader),
            Err(DatasetError::Table { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_coordinates() {
        let reader =
            csv::Reader::from_reader("track,northing,easting\na,oops,2.0\n".as_bytes());
        assert!(matches!(
            MetadataTable::from_csv(reader),
            Err(DatasetError::Table { row: 0, .. })
        ));
    }
}
