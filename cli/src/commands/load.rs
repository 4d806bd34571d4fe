//! The `load` subcommands: generic table writes and vendor export loading.

use anyhow::Context;
use load::config::Config;
use load::routing::Executor;
use load::vendors::adva::AdvaProbe;
use load::vendors::twst::TwstProbe;
use load::vendors::Vendor;
use load::writer::IfExists;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes caller-supplied rows to `table`. The payload is a path to a
/// YAML/JSON file or the document itself; a list becomes one write per row.
pub async fn table(
    config: &Config,
    table: &str,
    payload: &str,
    if_exists: &str,
) -> anyhow::Result<()> {
    let if_exists = IfExists::parse(if_exists)?;
    let rows = parse_payload(payload)?;

    let executor = Executor::from_config(config).await?;
    for row in rows {
        executor.write_to_table(table, row, if_exists).await?;
    }
    Ok(())
}

fn parse_payload(payload: &str) -> anyhow::Result<Vec<Value>> {
    let text = if Path::new(payload).is_file() {
        fs::read_to_string(payload).with_context(|| format!("failed to read {payload}"))?
    } else {
        payload.to_owned()
    };

    let value: Value =
        serde_yaml::from_str(&text).context("payload is not valid YAML or JSON")?;
    match value {
        Value::Array(rows) => Ok(rows),
        row => Ok(vec![row]),
    }
}

pub struct VendorLoad {
    pub file: PathBuf,
    pub metadata: bool,
    pub time_data: bool,
    pub no_archive: bool,
    pub chunk_size: Option<usize>,
}

/// Parses one vendor export and loads the selected halves. With neither
/// `--metadata` nor `--time-data`, both are loaded. The input file moves to
/// the archive directory after a successful load.
pub async fn vendor(config: &Config, vendor: Vendor, args: VendorLoad) -> anyhow::Result<()> {
    let load_metadata = args.metadata || !args.time_data;
    let load_time_data = args.time_data || !args.metadata;

    let (probe_key, metadata, readings) = match vendor {
        Vendor::Adva => {
            let probe = AdvaProbe::new(&args.file)?;
            let metadata = load_metadata.then(|| probe.process_metadata()).transpose()?;
            let readings = load_time_data
                .then(|| probe.process_time_data())
                .transpose()?;
            (probe.probe_key, metadata, readings)
        }
        Vendor::MicrochipTwst => {
            let probe = TwstProbe::new(&args.file)?;
            let metadata = load_metadata.then(|| probe.process_metadata()).transpose()?;
            let readings = load_time_data
                .then(|| probe.process_time_data())
                .transpose()?;
            (probe.probe_key, metadata, readings)
        }
    };

    let executor = Executor::from_config(config).await?;
    if let Some(metadata) = metadata {
        executor
            .load_probe_metadata(vendor, &probe_key, &metadata)
            .await?;
        tracing::info!(probe = %probe_key, %vendor, "loaded probe metadata");
    }
    if let Some(readings) = readings {
        executor
            .load_time_data(&probe_key, None, None, &readings, args.chunk_size)
            .await?;
        tracing::info!(probe = %probe_key, rows = readings.len(), "loaded time data");
    }

    if !args.no_archive {
        archive(&config.archive_path, &args.file)?;
    }
    Ok(())
}

fn archive(archive_path: &Path, file: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(archive_path)
        .with_context(|| format!("failed to create {}", archive_path.display()))?;
    let file_name = file
        .file_name()
        .with_context(|| format!("input path {} has no file name", file.display()))?;
    let target = archive_path.join(file_name);
    fs::rename(file, &target).with_context(|| {
        format!(
            "failed to archive {} to {}",
            file.display(),
            target.display()
        )
    })?;

    tracing::info!(to = %target.display(), "archived input file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn inline_json_payload_parses_as_one_row() {
        let rows = parse_payload(r#"{"name": "site", "public": true}"#).unwrap();
        assert_eq!(rows, vec![json!({"name": "site", "public": true})]);
    }

    #[test]
    fn inline_yaml_list_becomes_one_row_each() {
        let rows = parse_payload("- name: alpha\n- name: beta\n").unwrap();
        assert_eq!(rows, vec![json!({"name": "alpha"}), json!({"name": "beta"})]);
    }

    #[test]
    fn file_payloads_are_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.yaml");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"name: from-file\n").unwrap();

        let rows = parse_payload(path.to_str().unwrap()).unwrap();
        assert_eq!(rows, vec![json!({"name": "from-file"})]);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        assert!(parse_payload("{not yaml: [").is_err());
    }

    #[test]
    fn archive_moves_the_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("export.txt");
        fs::write(&input, "0 0.5\n").unwrap();
        let archive_dir = dir.path().join("archive");

        archive(&archive_dir, &input).unwrap();

        assert!(!input.exists());
        assert!(archive_dir.join("export.txt").exists());
    }
}
