//! Validates every `.bpmn` file under a directory against the model
//! parser, the way a CI job would gate a model before it ships.

use anyhow::{bail, Context};
use std::path::{Path, PathBuf};
use workflow_core::model::parser::parse_bpmn;

fn main() -> anyhow::Result<()> {
    let dir = parse_args()?;
    let files = collect_bpmn_files(&dir)?;
    if files.is_empty() {
        bail!("no .bpmn files found under {}", dir.display());
    }

    let mut failures = Vec::new();
    for file in &files {
        match validate_one(file) {
            Ok(model) => println!(
                "ok   {} (version {}, {} tasks, {} events)",
                file.display(),
                model.version(),
                model.tasks.len(),
                model.events.len()
            ),
            Err(err) => {
                println!("fail {} — {err}", file.display());
                failures.push(file.clone());
            }
        }
    }

    if !failures.is_empty() {
        bail!("{} of {} model(s) failed validation", failures.len(), files.len());
    }
    Ok(())
}

fn validate_one(path: &Path) -> anyhow::Result<workflow_core::BpmnModel> {
    let xml = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_bpmn(&xml).map_err(anyhow::Error::from)
}

fn collect_bpmn_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("reading directory {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("bpmn") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn parse_args() -> anyhow::Result<PathBuf> {
    let mut args = std::env::args().skip(1);
    match args.next() {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => bail!("usage: xtask validate-models <directory>"),
    }
}
