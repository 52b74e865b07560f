//! Readers for the cog, empty-slot and flag tables.

use std::io;
use std::path::{Path, PathBuf};

use crate::schema::{CatalogError, Cog, CogCatalog, Slot, SlotSet};

/// Cog attributes: `id,build_rate,flaggy_rate,exp_mult,affix`.
pub const COG_DATA_FILE: &str = "cog_datas.csv";
/// Eligible slot coordinates: `x,y`.
pub const EMPTIES_DATA_FILE: &str = "empties_datas.csv";
/// Flag coordinates: `x,y`.
pub const FLAGGIES_DATA_FILE: &str = "flaggies_datas.csv";

/// Input table errors.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Failed to read {path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Invalid data in {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: CatalogError,
    },
}

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::All);
    builder
}

/// Parse cog records.
pub fn read_cogs<R: io::Read>(reader: R) -> Result<Vec<Cog>, csv::Error> {
    let mut reader = reader_builder().from_reader(reader);
    let mut cogs = Vec::new();

    for result in reader.deserialize() {
        let cog: Cog = result?;
        cogs.push(cog);
    }

    Ok(cogs)
}

/// Parse `x,y` coordinate records.
pub fn read_slots<R: io::Read>(reader: R) -> Result<Vec<Slot>, csv::Error> {
    let mut reader = reader_builder().from_reader(reader);
    let mut slots = Vec::new();

    for result in reader.deserialize() {
        let slot: Slot = result?;
        slots.push(slot);
    }

    Ok(slots)
}

fn open(path: &Path) -> Result<std::fs::File, ReadError> {
    std::fs::File::open(path).map_err(|e| ReadError::Table {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Load and validate the cog catalog from a file.
pub fn read_cog_catalog(path: &Path) -> Result<CogCatalog, ReadError> {
    let cogs = read_cogs(open(path)?).map_err(|source| ReadError::Table {
        path: path.to_path_buf(),
        source,
    })?;
    CogCatalog::new(cogs).map_err(|source| ReadError::Catalog {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the set of eligible slots from a file.
pub fn read_slot_set(path: &Path) -> Result<SlotSet, ReadError> {
    let slots = read_coordinates(path)?;
    SlotSet::new(slots).map_err(|source| ReadError::Catalog {
        path: path.to_path_buf(),
        source,
    })
}

/// Load raw coordinates from a file.
pub fn read_coordinates(path: &Path) -> Result<Vec<Slot>, ReadError> {
    read_slots(open(path)?).map_err(|source| ReadError::Table {
        path: path.to_path_buf(),
        source,
    })
}

/// All input tables of a run.
#[derive(Debug, Clone)]
pub struct InputTables {
    pub catalog: CogCatalog,
    pub slots: SlotSet,
    /// Flag positions. Loaded for reporting only.
    pub flags: Vec<Slot>,
}

impl InputTables {
    /// Read the three standard tables from `dir`.
    ///
    /// The flag table is optional; a missing file yields no flags.
    pub fn load(dir: &Path) -> Result<Self, ReadError> {
        let catalog = read_cog_catalog(&dir.join(COG_DATA_FILE))?;
        let slots = read_slot_set(&dir.join(EMPTIES_DATA_FILE))?;

        let flags_path = dir.join(FLAGGIES_DATA_FILE);
        let flags = if flags_path.exists() {
            read_coordinates(&flags_path)?
        } else {
            log::warn!("No flag table at {}", flags_path.display());
            Vec::new()
        };

        log::info!(
            "Loaded {} cogs, {} slots and {} flags from {}",
            catalog.len(),
            slots.len(),
            flags.len(),
            dir.display()
        );

        Ok(Self {
            catalog,
            slots,
            flags,
        })
    }
}
