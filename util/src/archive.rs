//! Struct archiving functionality
//!
//! To add archiving functionality to a struct implement the `Archived` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
///
/// Records must be flat (no nested structs or maps) as required by the CSV
/// format.
#[derive(Default)]
pub struct Archiver {
    writer: Option<Writer<File>>,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A trait which enables a struct to be archived as a timestamped csv.
///
/// To implement this trait, the struct shall have an `Archiver` member which
/// shall be setup in the struct's `init` or `new` functions.
pub trait Archived {
    /// Write the archives for this struct
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a paricular path relative to the session's
    /// archive root.
    pub fn from_path<P: AsRef<Path>>(
        session: &Session,
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut session_path = session.arch_root.clone();
        session_path.push(path);

        Self::create(session_path)
    }

    /// Create a new archiver writing to the given file, truncating any
    /// existing contents.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        // Create the parent directory if needed
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Create the file, then open it in append mode
        File::create(path.as_ref())?;
        let file = OpenOptions::new().append(true).open(path.as_ref())?;

        let w = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self { writer: Some(w) })
    }

    /// Serialise a record into the archive.
    ///
    /// Writing to an archiver which was never created is a no-op.
    pub fn serialise<T: Serialize>(
        &mut self,
        record: T,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(ref mut w) = self.writer {
            w.serialize(record)?;
            w.flush()?
        }

        Ok(())
    }

    /// True if this archiver has a file to write to.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        time_s: f64,
        value: f64,
        flag: bool,
    }

    #[test]
    fn test_archive_rows() {
        let mut path = std::env::temp_dir();
        path.push(format!("thrust_sw_archive_test_{}", std::process::id()));
        path.push("rows.csv");

        let mut arch = Archiver::create(&path).unwrap();
        assert!(arch.is_open());

        arch.serialise(Row { time_s: 0.0, value: 1.5, flag: true }).unwrap();
        arch.serialise(Row { time_s: 0.1, value: -2.0, flag: false }).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines, vec!["time_s,value,flag", "0.0,1.5,true", "0.1,-2.0,false"]);

        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_is_noop() {
        let mut arch = Archiver::default();
        assert!(!arch.is_open());
        arch.serialise(Row { time_s: 0.0, value: 0.0, flag: false }).unwrap();
    }
}
