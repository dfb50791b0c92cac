//! Loader for the O*NET text database release (tab-delimited `.txt` files).
//!
//! Each row linking an occupation to a competency is one edge. Technology and
//! tool examples become `Tech Skills` / `Tools` competencies (plus `HOT` for
//! hot technologies); skills, knowledge and abilities become competencies
//! tagged with their scale, e.g. `IM-3.88`.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::scoring::models::{Competency, HOT, TECH_SKILLS, TOOLS};
use crate::taxonomy::{is_tech_or_scored, Taxonomy, TaxonomyProvider};

const OCCUPATION_FILE: &str = "Occupation Data.txt";
const TECHNOLOGY_FILE: &str = "Technology Skills.txt";
const TOOLS_FILE: &str = "Tools Used.txt";
/// Element files and the category label their competencies get.
const ELEMENT_FILES: [(&str, &str); 3] = [
    ("Skills.txt", "Skills"),
    ("Knowledge.txt", "Knowledge"),
    ("Abilities.txt", "Abilities"),
];

const COL_SOC: &str = "O*NET-SOC Code";
const COL_TITLE: &str = "Title";
const COL_EXAMPLE: &str = "Example";
const COL_COMMODITY: &str = "Commodity Code";
const COL_HOT: &str = "Hot Technology";
const COL_ELEMENT_ID: &str = "Element ID";
const COL_ELEMENT_NAME: &str = "Element Name";
const COL_SCALE: &str = "Scale ID";
const COL_VALUE: &str = "Data Value";

#[derive(Debug, Clone)]
struct Edge {
    occupation: String,
    competency: Competency,
}

/// The whole database held in memory, read-only after `open`.
#[derive(Debug, Clone, Default)]
pub struct OnetDatabase {
    edges: Vec<Edge>,
    titles: HashMap<String, String>,
}

impl OnetDatabase {
    /// Reads every known release file under `dir`. Missing files are skipped;
    /// a directory with no competency file at all is an error.
    pub fn open(dir: &Path) -> Result<Self> {
        let mut db = OnetDatabase::default();
        let mut loaded = 0;

        if let Some(table) = Table::read(&dir.join(OCCUPATION_FILE))? {
            let (soc, title) = (table.col(COL_SOC)?, table.col(COL_TITLE)?);
            for row in &table.rows {
                db.titles.insert(row[soc].clone(), row[title].clone());
            }
        }

        if let Some(table) = Table::read(&dir.join(TECHNOLOGY_FILE))? {
            db.load_examples(&table, TECH_SKILLS, true)
                .with_context(|| format!("reading {TECHNOLOGY_FILE}"))?;
            loaded += 1;
        }
        if let Some(table) = Table::read(&dir.join(TOOLS_FILE))? {
            db.load_examples(&table, TOOLS, false)
                .with_context(|| format!("reading {TOOLS_FILE}"))?;
            loaded += 1;
        }
        for (file, label) in ELEMENT_FILES {
            if let Some(table) = Table::read(&dir.join(file))? {
                db.load_elements(&table, label)
                    .with_context(|| format!("reading {file}"))?;
                loaded += 1;
            }
        }

        if loaded == 0 {
            bail!("no O*NET competency files found in {}", dir.display());
        }
        info!(
            "Loaded O*NET database from {}: {} edges across {} occupations",
            dir.display(),
            db.edges.len(),
            db.edges
                .iter()
                .map(|e| e.occupation.as_str())
                .collect::<HashSet<_>>()
                .len()
        );
        Ok(db)
    }

    fn load_examples(&mut self, table: &Table, category: &str, has_hot: bool) -> Result<()> {
        let soc = table.col(COL_SOC)?;
        let example = table.col(COL_EXAMPLE)?;
        let commodity = table.col(COL_COMMODITY)?;
        let hot = if has_hot { Some(table.col(COL_HOT)?) } else { None };

        for row in &table.rows {
            let mut categories = vec![category.to_string()];
            if hot.is_some_and(|h| row[h].eq_ignore_ascii_case("y")) {
                categories.push(HOT.to_string());
            }
            self.edges.push(Edge {
                occupation: row[soc].clone(),
                competency: Competency {
                    identifier: format!("{}:{}", row[commodity], row[example]),
                    name: row[example].clone(),
                    categories,
                },
            });
        }
        Ok(())
    }

    fn load_elements(&mut self, table: &Table, label: &str) -> Result<()> {
        let soc = table.col(COL_SOC)?;
        let id = table.col(COL_ELEMENT_ID)?;
        let name = table.col(COL_ELEMENT_NAME)?;
        let scale = table.col(COL_SCALE)?;
        let value = table.col(COL_VALUE)?;

        for row in &table.rows {
            self.edges.push(Edge {
                occupation: row[soc].clone(),
                competency: Competency {
                    identifier: row[id].clone(),
                    name: row[name].clone(),
                    categories: vec![label.to_string(), format!("{}-{}", row[scale], row[value])],
                },
            });
        }
        Ok(())
    }

    /// The taxonomy of one occupation: its technical or importance-scored
    /// edges. Competencies are deduplicated by identifier (first edge wins)
    /// while every kept edge still counts towards `num_edges`.
    pub fn for_occupation(&self, occupation_id: &str) -> Result<Taxonomy> {
        let mut seen = HashSet::new();
        let mut competencies = Vec::new();
        let mut num_edges = 0;

        for edge in self
            .edges
            .iter()
            .filter(|e| e.occupation == occupation_id && is_tech_or_scored(&e.competency))
        {
            num_edges += 1;
            if seen.insert(edge.competency.identifier.as_str()) {
                competencies.push(edge.competency.clone());
            }
        }

        if num_edges == 0 {
            return Err(anyhow!(
                "no technical or importance-scored competencies for occupation {occupation_id}"
            ));
        }

        Ok(Taxonomy {
            occupation_id: occupation_id.to_string(),
            name: self
                .titles
                .get(occupation_id)
                .cloned()
                .unwrap_or_else(|| occupation_id.to_string()),
            competencies,
            num_edges,
        })
    }
}

#[async_trait]
impl TaxonomyProvider for OnetDatabase {
    async fn taxonomy_for(&self, occupation_id: &str) -> Result<Taxonomy> {
        self.for_occupation(occupation_id)
    }
}

/// A tab-delimited file with a header row.
#[derive(Debug)]
struct Table {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// `Ok(None)` when the file does not exist.
    fn read(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            warn!("O*NET file {} not found, skipping", path.display());
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content)
            .map(Some)
            .with_context(|| format!("malformed O*NET file {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let mut lines = content.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next().ok_or_else(|| anyhow!("file is empty"))?;
        let mut columns: HashMap<String, usize> = HashMap::new();
        let mut width = 0;
        for (i, name) in header.split('\t').enumerate() {
            let name = name.trim();
            if columns.insert(name.to_string(), i).is_some() {
                bail!("duplicate column '{name}' in header");
            }
            width = i + 1;
        }

        let mut rows = Vec::new();
        for (n, line) in lines.enumerate() {
            let fields: Vec<String> = line.split('\t').map(|f| f.trim().to_string()).collect();
            if fields.len() < width {
                bail!("line {} has {} fields, expected {width}", n + 2, fields.len());
            }
            rows.push(fields);
        }
        Ok(Self { columns, rows })
    }

    fn col(&self, name: &str) -> Result<usize> {
        self.columns
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("missing column '{name}'"))
    }
}
