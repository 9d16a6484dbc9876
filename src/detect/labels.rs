//! Class lookup tables loaded once at startup.
//!
//! - `ClassNames`: localizer classes, one name per line, indexed by row.
//! - `ClassTable`: classifier id → name table, CSV with a `ClassId,ClassName` header.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

const CLASS_ID_COLUMN: &str = "ClassId";
const CLASS_NAME_COLUMN: &str = "ClassName";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class names {}", path.display()))?;
        Self::from_lines(&raw).with_context(|| format!("invalid class names {}", path.display()))
    }

    pub fn from_lines(raw: &str) -> Result<Self> {
        let mut names: Vec<String> = raw.lines().map(|line| line.trim_end().to_string()).collect();
        while names.last().is_some_and(|name| name.is_empty()) {
            names.pop();
        }
        if names.is_empty() {
            return Err(anyhow!("class name list is empty"));
        }
        Ok(Self { names })
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassTable {
    names: HashMap<usize, String>,
}

impl ClassTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class table {}", path.display()))?;
        Self::from_csv(&raw).with_context(|| format!("invalid class table {}", path.display()))
    }

    pub fn from_csv(raw: &str) -> Result<Self> {
        let mut lines = raw.lines().filter(|line| !line.trim().is_empty());
        let header = lines.next().ok_or_else(|| anyhow!("class table is empty"))?;
        let columns = split_csv_record(header);
        let id_col = column_index(&columns, CLASS_ID_COLUMN)?;
        let name_col = column_index(&columns, CLASS_NAME_COLUMN)?;

        let mut names = HashMap::new();
        for (row, line) in lines.enumerate() {
            let fields = split_csv_record(line);
            let (Some(id), Some(name)) = (fields.get(id_col), fields.get(name_col)) else {
                return Err(anyhow!("row {} has {} fields", row + 1, fields.len()));
            };
            let id: usize = id
                .parse()
                .map_err(|_| anyhow!("row {}: class id '{}' is not an integer", row + 1, id))?;
            names.insert(id, name.clone());
        }
        if names.is_empty() {
            return Err(anyhow!("class table has no rows"));
        }
        Ok(Self { names })
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn column_index(columns: &[String], wanted: &str) -> Result<usize> {
    columns
        .iter()
        .position(|column| column == wanted)
        .ok_or_else(|| anyhow!("missing '{}' column", wanted))
}

/// Split one CSV record, honouring double-quoted fields with `""` escapes.
fn split_csv_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut field).trim().to_string()),
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}
