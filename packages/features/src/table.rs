//! CSV-backed property table.
//!
//! Keeps every source column as a string so that unrelated columns pass
//! through the pipeline untouched, and feature columns are appended (or
//! overwritten) by name.

use std::io::{Read, Write};
use std::path::Path;

use sg_housing_amenity_models::PropertyPoint;

use crate::FeatureError;
use crate::config::{ColumnConfig, LATITUDE_ALIASES, LONGITUDE_ALIASES};

/// A property table: header row plus string cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PropertyTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl PropertyTable {
    /// Creates a table from headers and rows.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::RowWidth`] if any row does not have exactly
    /// one cell per header.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, FeatureError> {
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != headers.len())
        {
            return Err(FeatureError::RowWidth {
                row,
                expected: headers.len(),
                actual: cells.len(),
            });
        }
        Ok(Self { headers, rows })
    }

    /// Reads a table from CSV with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Csv`] on malformed CSV or ragged rows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FeatureError> {
        let mut csv_reader = csv::ReaderBuilder::new().from_reader(reader);

        let headers = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            rows.push(record?.iter().map(String::from).collect());
        }

        Self::new(headers, rows)
    }

    /// Reads a CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the file cannot be opened or parsed.
    pub fn from_path(path: &Path) -> Result<Self, FeatureError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(std::io::BufReader::new(file))?;
        log::info!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    /// Writes the table as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Csv`] if writing fails.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), FeatureError> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the table to a CSV file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError`] if the file cannot be created or written.
    pub fn write_path(&self, path: &Path) -> Result<(), FeatureError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))?;
        log::info!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }

    /// Column names in order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact (case-sensitive) column lookup.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Finds a column by its configured name, falling back to
    /// case-insensitive matches against `aliases`.
    #[must_use]
    pub fn resolve_column(&self, name: &str, aliases: &[&str]) -> Option<usize> {
        self.column_index(name).or_else(|| {
            aliases.iter().find_map(|alias| {
                self.headers
                    .iter()
                    .position(|h| h.eq_ignore_ascii_case(alias))
            })
        })
    }

    fn require_column(&self, name: &str, aliases: &[&str]) -> Result<usize, FeatureError> {
        self.resolve_column(name, aliases)
            .ok_or_else(|| FeatureError::MissingColumn {
                name: name.to_string(),
            })
    }

    /// Cell values for a column, by index.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.rows.iter().map(move |row| row[idx].as_str())
    }

    /// Replaces the column named `name` with `values`, or appends it when
    /// no such column exists.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::RowWidth`] if `values` does not have one
    /// entry per row.
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<(), FeatureError> {
        if values.len() != self.rows.len() {
            return Err(FeatureError::RowWidth {
                row: values.len().min(self.rows.len()),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        if let Some(idx) = self.column_index(name) {
            for (row, value) in self.rows.iter_mut().zip(values) {
                row[idx] = value;
            }
        } else {
            self.headers.push(name.to_string());
            for (row, value) in self.rows.iter_mut().zip(values) {
                row.push(value);
            }
        }

        Ok(())
    }

    /// Parses every row into a [`PropertyPoint`], or `None` where the
    /// coordinates are missing or invalid.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::MissingColumn`] if the latitude or longitude
    /// column cannot be found.
    pub fn property_points(
        &self,
        columns: &ColumnConfig,
    ) -> Result<Vec<Option<PropertyPoint>>, FeatureError> {
        let lat_idx = self.require_column(&columns.latitude, LATITUDE_ALIASES)?;
        let lon_idx = self.require_column(&columns.longitude, LONGITUDE_ALIASES)?;
        let id_idx = self.column_index(&columns.id);

        Ok(self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let latitude = parse_latitude(&row[lat_idx])?;
                let longitude = parse_longitude(&row[lon_idx])?;
                let id = id_idx.map_or_else(|| i.to_string(), |idx| row[idx].clone());
                Some(PropertyPoint {
                    id,
                    latitude,
                    longitude,
                })
            })
            .collect())
    }

    /// Drops rows with missing or invalid coordinates and returns how many
    /// were dropped.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::MissingColumn`] if the latitude or longitude
    /// column cannot be found.
    pub fn retain_valid_coordinates(&mut self, columns: &ColumnConfig) -> Result<usize, FeatureError> {
        let points = self.property_points(columns)?;
        let before = self.rows.len();

        let mut valid = points.iter().map(Option::is_some);
        self.rows.retain(|_| valid.next().unwrap_or(false));

        let dropped = before - self.rows.len();
        if dropped > 0 {
            log::warn!("Dropped {dropped} of {before} rows with missing or invalid coordinates");
        }
        Ok(dropped)
    }
}

/// Parses a finite decimal number from a cell, ignoring surrounding
/// whitespace. Empty cells and `NaN` yield `None`.
#[must_use]
pub fn parse_number(cell: &str) -> Option<f64> {
    cell.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

fn parse_latitude(cell: &str) -> Option<f64> {
    parse_number(cell).filter(|lat| (-90.0..=90.0).contains(lat))
}

fn parse_longitude(cell: &str) -> Option<f64> {
    parse_number(cell).filter(|lon| (-180.0..=180.0).contains(lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
id,town,lat,lng
a,BISHAN,1.3500,103.8480
b,TAMPINES,,103.9400
c,BEDOK,NaN,103.9300
d,JURONG WEST,1.3400,103.7000
e,PUNGGOL,not-a-number,103.9000
";

    #[test]
    fn reads_headers_and_rows() {
        let table = PropertyTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.headers(), ["id", "town", "lat", "lng"]);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn resolves_coordinate_aliases() {
        let table = PropertyTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let points = table.property_points(&ColumnConfig::default()).unwrap();

        let first = points[0].as_ref().unwrap();
        assert_eq!(first.id, "a");
        assert!((first.latitude - 1.35).abs() < 1e-9);
        assert!((first.longitude - 103.848).abs() < 1e-9);
        assert!(points[1].is_none());
        assert!(points[2].is_none());
        assert!(points[4].is_none());
    }

    #[test]
    fn drops_rows_with_invalid_coordinates() {
        let mut table = PropertyTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let dropped = table
            .retain_valid_coordinates(&ColumnConfig::default())
            .unwrap();
        assert_eq!(dropped, 3);
        let ids: Vec<&str> = table.column_values(0).collect();
        assert_eq!(ids, ["a", "d"]);
    }

    #[test]
    fn missing_coordinate_column_is_an_error() {
        let table = PropertyTable::from_reader("id,town\n1,BISHAN\n".as_bytes()).unwrap();
        let err = table
            .property_points(&ColumnConfig::default())
            .unwrap_err();
        assert!(matches!(err, FeatureError::MissingColumn { .. }));
    }

    #[test]
    fn falls_back_to_row_number_without_id_column() {
        let table =
            PropertyTable::from_reader("latitude,longitude\n1.3,103.8\n1.4,103.9\n".as_bytes())
                .unwrap();
        let points = table.property_points(&ColumnConfig::default()).unwrap();
        assert_eq!(points[1].as_ref().unwrap().id, "1");
    }

    #[test]
    fn set_column_appends_then_overwrites() {
        let mut table = PropertyTable::from_reader("id\na\nb\n".as_bytes()).unwrap();

        table
            .set_column("score", vec!["1".to_string(), "2".to_string()])
            .unwrap();
        assert_eq!(table.headers(), ["id", "score"]);

        table
            .set_column("score", vec!["3".to_string(), "4".to_string()])
            .unwrap();
        assert_eq!(table.headers(), ["id", "score"]);
        assert_eq!(table.rows()[1], ["b", "4"]);

        assert!(table.set_column("score", vec![String::new()]).is_err());
    }

    #[test]
    fn rejects_ragged_rows() {
        let err = PropertyTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec!["1".to_string()]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FeatureError::RowWidth {
                row: 0,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn writes_csv_round_trip() {
        let table = PropertyTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        let reread = PropertyTable::from_reader(out.as_slice()).unwrap();
        assert_eq!(reread, table);
    }
}
