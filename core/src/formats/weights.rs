//! Weight file reader
//!
//! ```text
//! b,<name>
//! w,<globalVertexIndex>,<boneListPosition>,<weight>
//! ```
//!
//! The whole file is read before anything is applied to the host, so an I/O
//! failure part way through never leaves a half merged result. Bad records
//! are dropped with a [`RecordWarning`]; lines with unknown tags are ignored.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use super::{COMMENT, SEPARATOR};
use crate::error::{RecordWarning, Result, SkinError};

/// One `w` line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightRecord {
    /// 1-based line number in the weight file
    pub line: usize,
    /// Global vertex index
    pub vertex: u32,
    /// Position in the bone list
    pub bone: usize,
    /// Weight in [0, 1]
    pub weight: f32,
}

/// Parsed contents of a weight file.
#[derive(Debug, Clone, Default)]
pub struct WeightFile {
    /// Group names declared by `b` lines, in order
    pub groups: Vec<String>,
    /// Valid `w` records, in file order
    pub records: Vec<WeightRecord>,
    /// Records dropped while parsing
    pub warnings: Vec<RecordWarning>,
}

impl WeightFile {
    /// Load a weight file written by the solver.
    ///
    /// A missing file means the solver produced no output.
    pub fn load(path: &Path) -> Result<Self> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SkinError::NoOutput(path.to_path_buf()));
            }
            Err(e) => return Err(SkinError::io(path, e)),
        };

        Self::parse(BufReader::new(file)).map_err(|e| SkinError::io(path, e))
    }

    /// Parse weight file contents.
    pub fn parse<R: BufRead>(reader: R) -> io::Result<Self> {
        let mut file = Self::default();

        for (index, raw) in reader.split(b'\n').enumerate() {
            let raw = raw?;
            let text = String::from_utf8_lossy(&raw);
            file.parse_line(index + 1, text.trim_end_matches(['\r', '\n']));
        }

        tracing::debug!(
            "Parsed weight file: {} groups, {} records, {} dropped",
            file.groups.len(),
            file.records.len(),
            file.warnings.len()
        );

        Ok(file)
    }

    fn parse_line(&mut self, line: usize, text: &str) {
        if text.trim().is_empty() || text.starts_with(COMMENT) {
            return;
        }

        let fields: Vec<&str> = text.split(SEPARATOR).map(str::trim).collect();
        match fields[0] {
            "b" => match fields.get(1) {
                Some(name) if !name.is_empty() => self.groups.push((*name).to_string()),
                _ => self.warnings.push(RecordWarning::Malformed {
                    line,
                    reason: "group declaration without a name".to_string(),
                }),
            },
            "w" => match parse_weight_record(line, &fields) {
                Ok(record) => self.records.push(record),
                Err(warning) => self.warnings.push(warning),
            },
            _ => {}
        }
    }

    /// Whether the file declared its own group list
    pub fn declares_groups(&self) -> bool {
        !self.groups.is_empty()
    }
}

fn parse_weight_record(line: usize, fields: &[&str]) -> Result<WeightRecord, RecordWarning> {
    let malformed = |reason: String| RecordWarning::Malformed { line, reason };

    if fields.len() != 4 {
        return Err(malformed(format!(
            "expected 3 fields after 'w', found {}",
            fields.len() - 1
        )));
    }

    let vertex = fields[1]
        .parse::<u32>()
        .map_err(|_| malformed(format!("invalid vertex index {:?}", fields[1])))?;
    let bone = fields[2]
        .parse::<usize>()
        .map_err(|_| malformed(format!("invalid bone position {:?}", fields[2])))?;
    let weight = fields[3]
        .parse::<f32>()
        .map_err(|_| malformed(format!("invalid weight {:?}", fields[3])))?;

    if !(0.0..=1.0).contains(&weight) {
        return Err(RecordWarning::WeightOutOfRange { line, weight });
    }

    Ok(WeightRecord {
        line,
        vertex,
        bone,
        weight,
    })
}
