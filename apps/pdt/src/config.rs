use anyhow::{Context, Result};
use pdt_engine::ViewDeclaration;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// One warehouse connection record from the connections YAML file.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub name: String,
    pub dialect: String,
    pub username: String,
    pub password: String,
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
}

fn default_port() -> u16 {
    5439
}

impl ConnectionConfig {
    pub fn postgres_config(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            self.hostname, self.port, self.username, self.password, self.database
        )
    }
}

pub fn load_connections<P: AsRef<Path>>(path: P) -> Result<Vec<ConnectionConfig>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .context(format!("Failed to read connections file: {:?}", path))?;
    serde_yaml::from_str(&content).context("Failed to parse connections file")
}

/// Load every view declaration from the `*.yml`/`*.yaml` files in a
/// directory. Each file holds a YAML list of declarations; files are read in
/// name order. Returns the file count alongside the declarations for the
/// load summary.
pub fn load_view_declarations<P: AsRef<Path>>(dir: P) -> Result<(usize, Vec<ViewDeclaration>)> {
    let dir = dir.as_ref();
    let mut paths: Vec<_> = fs::read_dir(dir)
        .context(format!("Failed to read views directory: {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yml") | Some("yaml")
            )
        })
        .collect();
    paths.sort();

    let mut declarations = Vec::new();
    for path in &paths {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read view file: {:?}", path))?;
        let mut file_declarations: Vec<ViewDeclaration> = serde_yaml::from_str(&content)
            .context(format!("Failed to parse view file: {:?}", path))?;
        declarations.append(&mut file_declarations);
    }
    Ok((paths.len(), declarations))
}
