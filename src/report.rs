//! Report output: a header line followed by one `id:capacity:consumption`
//! line per station, ascending by id.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::aggregate::Category;
use crate::index::StationIndex;
use crate::record::Tier;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot create output directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write report {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Writes the header and every station of `index` to `out`.
pub fn write_report<W: Write>(
    mut out: W,
    tier: Tier,
    category: Category,
    index: &StationIndex,
) -> io::Result<()> {
    writeln!(out, "{tier}:Capacity:{category}")?;
    for station in index {
        writeln!(out, "{station}")?;
    }
    out.flush()
}

/// `hvb_comp.csv`, or `hvb_comp_3.csv` for a run restricted to plant 3.
pub fn output_file_name(tier: Tier, category: Category, plant: Option<u32>) -> String {
    match plant {
        Some(plant) => format!("{tier}_{category}_{plant}.csv"),
        None => format!("{tier}_{category}.csv"),
    }
}

/// Writes the report into `dir` (created if needed) and returns its path.
pub fn write_report_file(
    dir: &Path,
    tier: Tier,
    category: Category,
    plant: Option<u32>,
    index: &StationIndex,
) -> Result<PathBuf, ReportError> {
    fs::create_dir_all(dir).map_err(|source| ReportError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let path = dir.join(output_file_name(tier, category, plant));
    let write = |path: &Path| -> io::Result<()> {
        let file = File::create(path)?;
        write_report(BufWriter::new(file), tier, category, index)
    };
    write(&path).map_err(|source| ReportError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
