//! Checkout address records, loaded once at startup.
//!
//! The people file is a JSON array of address records. It is read exactly
//! once when the runner starts; a missing, malformed or empty file aborts
//! startup instead of surfacing mid-run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Deserialize;
use thiserror::Error;

/// A shipping address used to fill the checkout form.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Person {
    /// Street address, e.g. `1 Main St`.
    pub address: String,
    /// City name.
    pub city: String,
    /// State or province.
    pub state: String,
    /// Postal code.
    pub zip: String,
    /// Country code.
    pub country: String,
}

/// The pool of candidate checkout addresses.
///
/// Cheap to clone; all clones share the same records. Guaranteed non-empty
/// by construction.
#[derive(Clone, Debug)]
pub struct People(Arc<Vec<Person>>);

impl People {
    /// Reads the people file at `path`.
    pub fn load(path: &Path) -> Result<Self, PeopleError> {
        let file = std::fs::File::open(path).map_err(|cause| PeopleError::Io {
            path: path.to_owned(),
            cause,
        })?;
        let records: Vec<Person> =
            serde_json::from_reader(file).map_err(|cause| PeopleError::Json {
                path: path.to_owned(),
                cause,
            })?;

        Self::from_records(records).ok_or_else(|| PeopleError::Empty {
            path: path.to_owned(),
        })
    }

    /// Builds a pool directly from records.
    ///
    /// Returns `None` if `records` is empty.
    pub fn from_records(records: Vec<Person>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(Self(Arc::new(records)))
    }

    /// Picks one record uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &Person {
        self.0.choose(rng).expect("people pool is never empty")
    }

    /// The number of records in the pool.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; the pool is non-empty by construction.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Errors loading the people file.
#[derive(Debug, Error)]
pub enum PeopleError {
    /// The file could not be opened or read.
    #[error("failed to read people file `{}`", path.display())]
    Io {
        /// Path of the file that failed to open.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        cause: std::io::Error,
    },

    /// The file is not a valid JSON array of address records.
    #[error("failed to parse people file `{}`", path.display())]
    Json {
        /// Path of the file that failed to parse.
        path: PathBuf,
        /// The underlying deserialization error.
        #[source]
        cause: serde_json::Error,
    },

    /// The file parsed but contains no records.
    #[error("people file `{}` contains no records", path.display())]
    Empty {
        /// Path of the empty file.
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_people(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_record_list() {
        let file = write_people(
            r#"[
                {"address": "1 Main St", "city": "Springfield", "state": "IL", "zip": "62704", "country": "US"},
                {"address": "42 Elm Ave", "city": "Portland", "state": "OR", "zip": "97201", "country": "US"}
            ]"#,
        );

        let people = People::load(file.path()).unwrap();
        assert_eq!(people.len(), 2);

        let mut rng = rand::rng();
        let person = people.choose(&mut rng);
        assert!(["1 Main St", "42 Elm Ave"].contains(&person.address.as_str()));
    }

    #[test]
    fn missing_file_fails() {
        let err = People::load(Path::new("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, PeopleError::Io { .. }));
    }

    #[test]
    fn malformed_file_fails() {
        let file = write_people("{not json");
        let err = People::load(file.path()).unwrap_err();
        assert!(matches!(err, PeopleError::Json { .. }));
    }

    #[test]
    fn empty_list_fails() {
        let file = write_people("[]");
        let err = People::load(file.path()).unwrap_err();
        assert!(matches!(err, PeopleError::Empty { .. }));
    }
}
