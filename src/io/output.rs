//! Result files: the text report, the layout record and the move table.

use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::compute::{CogArray, LayoutError, LayoutRow, read_rows};

use super::moves::{Move, write_moves};

/// Version stamp written as the first line of the report.
pub const VERSION: &str = concat!("Cogstruction ", env!("CARGO_PKG_VERSION"));

/// Human-readable report.
pub const REPORT_FILE: &str = "output.txt";
/// Canonical layout record, also read back as the prior layout.
pub const LAYOUT_FILE: &str = "cog_array.csv";
/// Move table.
pub const MOVES_FILE: &str = "moves.csv";

/// Output file errors.
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid layout record {path}: {source}")]
    Layout {
        path: PathBuf,
        #[source]
        source: LayoutError,
    },
    #[error("Failed to write {path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn create(path: &Path) -> Result<BufWriter<fs::File>, OutputError> {
    fs::File::create(path)
        .map(BufWriter::new)
        .map_err(io_error(path))
}

/// Report text: the version line followed by the grid rendering.
pub fn render_report(layout: &CogArray) -> String {
    format!("{}\n{}\n", VERSION, layout)
}

/// Write the text report into `dir`.
pub fn write_report(dir: &Path, layout: &CogArray) -> Result<PathBuf, OutputError> {
    let path = dir.join(REPORT_FILE);
    let mut writer = create(&path)?;
    writer
        .write_all(render_report(layout).as_bytes())
        .and_then(|_| writer.flush())
        .map_err(io_error(&path))?;
    Ok(path)
}

/// Write the canonical layout record into `dir`.
pub fn write_layout_record(dir: &Path, layout: &CogArray) -> Result<PathBuf, OutputError> {
    let path = dir.join(LAYOUT_FILE);
    let writer = create(&path)?;
    layout
        .write_record(writer)
        .map_err(|source| OutputError::Layout {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// Write the move table into `dir`.
pub fn write_move_table(dir: &Path, moves: &[Move]) -> Result<PathBuf, OutputError> {
    let path = dir.join(MOVES_FILE);
    let writer = create(&path)?;
    write_moves(moves, writer).map_err(|source| OutputError::Table {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Version line of a previous report in `dir`, if there is one.
pub fn read_prior_version(dir: &Path) -> Option<String> {
    let file = fs::File::open(dir.join(REPORT_FILE)).ok()?;
    let mut line = String::new();
    BufReader::new(file).read_line(&mut line).ok()?;
    let line = line.trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// Read the layout record of a previous run from `dir`.
///
/// A missing record is not an error: the first run has none.
pub fn read_prior_layout(dir: &Path) -> Result<Option<Vec<LayoutRow>>, OutputError> {
    let path = dir.join(LAYOUT_FILE);
    let file = match fs::File::open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("No previous layout found at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(io_error(&path)(e)),
    };

    let rows = read_rows(file).map_err(|source| OutputError::Layout {
        path: path.clone(),
        source,
    })?;
    log::info!("Read previous layout with {} cogs from {}", rows.len(), path.display());
    Ok(Some(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{Origin, plan_moves};
    use crate::schema::{Cog, CogCatalog, CogId, Slot, SlotSet};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn layout() -> CogArray {
        let catalog = CogCatalog::new(vec![
            Cog::new(1, 10.0, 2.0, 0.5),
            Cog::new(2, 3.0, 7.0, 0.25).with_affix("column"),
        ])
        .unwrap();
        let slots = SlotSet::new([Slot::new(0, 0), Slot::new(1, 0), Slot::new(0, 1)]).unwrap();
        CogArray::from_placements(
            Arc::new(catalog),
            Arc::new(slots),
            &[(Slot::new(1, 0), CogId(1)), (Slot::new(0, 1), CogId(2))],
        )
        .unwrap()
    }

    #[test]
    fn test_report_starts_with_version() {
        let dir = tempdir().unwrap();
        let path = write_report(dir.path(), &layout()).unwrap();

        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().next(), Some(VERSION));
        assert!(text.contains("Build rate: 13.000"));
        assert_eq!(read_prior_version(dir.path()).as_deref(), Some(VERSION));
    }

    #[test]
    fn test_layout_record_round_trip() {
        let dir = tempdir().unwrap();
        let layout = layout();
        write_layout_record(dir.path(), &layout).unwrap();

        let rows = read_prior_layout(dir.path()).unwrap().unwrap();
        assert_eq!(rows, layout.rows());
    }

    #[test]
    fn test_missing_prior_layout_is_soft() {
        let dir = tempdir().unwrap();
        assert!(read_prior_layout(dir.path()).unwrap().is_none());
        assert!(read_prior_version(dir.path()).is_none());
    }

    #[test]
    fn test_corrupt_prior_layout_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(LAYOUT_FILE), "cog,x,y\nnot,a,row\n").unwrap();
        assert!(matches!(
            read_prior_layout(dir.path()),
            Err(OutputError::Layout { .. })
        ));
    }

    #[test]
    fn test_second_run_moves_from_prior_positions() {
        let dir = tempdir().unwrap();
        let layout = layout();
        write_layout_record(dir.path(), &layout).unwrap();

        let prior = read_prior_layout(dir.path()).unwrap().unwrap();
        let moves = plan_moves(&prior, &layout);
        write_move_table(dir.path(), &moves).unwrap();

        assert!(moves.iter().all(|m| matches!(m.from, Origin::Slot(_))));
        let table = fs::read_to_string(dir.path().join(MOVES_FILE)).unwrap();
        assert_eq!(table, "cog,to_x,to_y,from\n1,1,0,1:0\n2,0,1,0:1\n");
    }
}
