use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{CatalogLoad, CitySource};
use crate::SkydashError;

/// City names read from one column of a CSV file with a header row.
pub struct CsvCitySource {
    path: PathBuf,
    column: String,
}

impl CsvCitySource {
    pub fn new(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            column: column.into(),
        }
    }

    /// Read `column` from every row of `path`.
    pub fn load_file(path: &Path, column: &str) -> CatalogLoad {
        match Self::open(path) {
            Ok(file) => Self::parse_reader(file, column),
            Err(e) => {
                warn!("Cannot open city file {}", path.display());
                CatalogLoad::partial(Vec::new(), e)
            }
        }
    }

    fn open(path: &Path) -> crate::Result<File> {
        debug!("Reading cities from {:?}", path);
        Ok(File::open(path)?)
    }

    /// Stream rows from `reader`. The first malformed row ends the load;
    /// rows before it are kept.
    pub fn parse_reader<R: Read>(reader: R, column: &str) -> CatalogLoad {
        let mut reader = csv::Reader::from_reader(reader);

        let index = match reader.headers() {
            Ok(headers) => headers.iter().position(|header| header == column),
            Err(e) => {
                return CatalogLoad::partial(
                    Vec::new(),
                    SkydashError::catalog_load(format!("Failed to read CSV header: {e}")),
                );
            }
        };
        let Some(index) = index else {
            return CatalogLoad::partial(
                Vec::new(),
                SkydashError::catalog_load(format!("CSV has no '{column}' column")),
            );
        };

        let mut cities = Vec::new();
        for record in reader.records() {
            match record {
                Ok(record) => match record.get(index) {
                    Some(city) => cities.push(city.to_string()),
                    None => warn!("Skipping CSV row without a '{}' field", column),
                },
                Err(e) => {
                    return CatalogLoad::partial(
                        cities,
                        SkydashError::catalog_load(format!("Malformed CSV row: {e}")),
                    );
                }
            }
        }

        CatalogLoad::complete(cities)
    }
}

#[async_trait]
impl CitySource for CsvCitySource {
    fn name(&self) -> &'static str {
        "CSV"
    }

    async fn fetch_cities(&self) -> CatalogLoad {
        let path = self.path.clone();
        let column = self.column.clone();

        tokio::task::spawn_blocking(move || Self::load_file(&path, &column))
            .await
            .unwrap_or_else(|e| {
                CatalogLoad::partial(
                    Vec::new(),
                    SkydashError::catalog_load(format!("CSV loader task failed: {e}")),
                )
            })
    }
}
