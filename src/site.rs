use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::info;

use crate::error::DatapagesError;
use crate::species::SpeciesTable;

/// Slug used for a species' data file: lowercase, ASCII alphanumerics
/// kept, everything else collapsed to single underscores.
pub fn species_filename(species: &str) -> String {
    let mut slug = String::with_capacity(species.len());
    for ch in species.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    format!("{slug}.json")
}

#[derive(Debug, Serialize)]
struct Summary {
    species: BTreeMap<String, SummaryEntry>,
    created: String,
}

#[derive(Debug, Serialize)]
struct SummaryEntry {
    filename: String,
    count: usize,
}

/// Publishes one domain's data directory. Files are written into a
/// timestamped temp directory next to the live tree, the previous site
/// state is copied to `<site>_backup`, and the temp data directory is
/// renamed into place, so a reader of `<site>/<domain>/data` never sees a
/// partially written state.
pub fn write_domain_data_files(
    tables: &[(String, SpeciesTable)],
    site_dir: &Utf8Path,
    domain_name: &str,
    now: DateTime<Utc>,
) -> Result<Utf8PathBuf, DatapagesError> {
    let timestamp = now.format("%Y%m%d%H%M%S");
    let output_dir_temp = site_dir.join(format!("{domain_name}_{timestamp}_temp"));
    let data_dir_temp = output_dir_temp.join("data");
    let data_dir = site_dir.join(domain_name).join("data");
    let backup_dir = Utf8PathBuf::from(format!("{site_dir}_backup"));
    info!("about to write data to {data_dir}");

    fs::create_dir_all(data_dir_temp.as_std_path())
        .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;

    let mut summary = Summary {
        species: BTreeMap::new(),
        created: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    };
    for (species, table) in tables {
        let filename = species_filename(species);
        write_json(&data_dir_temp.join(&filename), table)?;
        summary.species.insert(
            species.clone(),
            SummaryEntry {
                filename,
                count: table.count,
            },
        );
    }
    write_json(&data_dir_temp.join("_data_summary.json"), &summary)?;

    remove_dir_if_present(&backup_dir)?;
    if site_dir.as_std_path().exists() {
        copy_dir_recursive(site_dir.as_std_path(), backup_dir.as_std_path())?;
    }

    remove_dir_if_present(&data_dir)?;
    if let Some(parent) = data_dir.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
    }
    fs::rename(data_dir_temp.as_std_path(), data_dir.as_std_path())
        .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
    remove_dir_if_present(&output_dir_temp)?;
    Ok(data_dir)
}

/// Writes the static index page for one domain, linking every visible
/// species to its data file.
pub fn write_domain_index(
    species_list: &[&str],
    site_dir: &Utf8Path,
    domain_name: &str,
    domain_title: &str,
) -> Result<(), DatapagesError> {
    let index_path = site_dir.join(domain_name).join("index.html");
    info!("writing index page for {domain_name} to {index_path}");
    if let Some(parent) = index_path.parent() {
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
    }

    let mut items = String::new();
    for species in species_list {
        let filename = species_filename(species);
        items.push_str(&format!(
            "      <li><a href=\"data/{filename}\">{species}</a></li>\n"
        ));
    }
    let html = format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         \x20 <meta charset=\"utf-8\">\n\
         \x20 <title>{domain_title}</title>\n\
         </head>\n\
         <body>\n\
         \x20 <h1>{domain_title}</h1>\n\
         \x20 <ul>\n\
         {items}\
         \x20 </ul>\n\
         </body>\n\
         </html>\n"
    );
    fs::write(index_path.as_std_path(), html.as_bytes())
        .map_err(|err| DatapagesError::Filesystem(err.to_string()))
}

fn write_json<T: Serialize>(path: &Utf8Path, value: &T) -> Result<(), DatapagesError> {
    let content =
        serde_json::to_vec(value).map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
    fs::write(path.as_std_path(), &content)
        .map_err(|err| DatapagesError::Filesystem(err.to_string()))
}

fn remove_dir_if_present(path: &Utf8Path) -> Result<(), DatapagesError> {
    match fs::remove_dir_all(path.as_std_path()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(DatapagesError::Filesystem(err.to_string())),
    }
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<(), DatapagesError> {
    fs::create_dir_all(dest).map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
    for entry in walk_dir(source)? {
        let relative = entry
            .strip_prefix(source)
            .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
        let target = dest.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
            }
            fs::copy(&entry, &target).map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
        }
    }
    Ok(())
}

fn walk_dir(root: &Path) -> Result<Vec<PathBuf>, DatapagesError> {
    let mut items = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(path) = stack.pop() {
        let entries =
            fs::read_dir(&path).map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
            let path = entry.path();
            if path.is_dir() {
                stack.push(path.clone());
            }
            items.push(path);
        }
    }
    Ok(items)
}
