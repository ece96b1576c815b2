use code_splitter::{Chunk, StatsSummary, Unit};
use serde::{Deserialize, Serialize};

/// One parsed source file, as produced by an external front end
#[derive(Debug, Deserialize)]
pub struct InputFile {
    pub path: String,
    #[serde(default)]
    pub units: Vec<Unit>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub files: Vec<FileReport>,
    pub stats: StatsSummary,
}

#[derive(Debug, Serialize)]
pub struct FileReport {
    pub path: String,
    pub units: Vec<UnitReport>,
}

#[derive(Debug, Serialize)]
pub struct UnitReport {
    pub name: String,
    pub signature: String,
    pub chunk: Chunk,
}
