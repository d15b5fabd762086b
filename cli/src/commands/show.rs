use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use dex_intel::{Dex, DexOptions, DexSnapshot, SignatureCatalog};
use log::debug;

use crate::commands::path_helpers::get_all_files;

pub(crate) fn command_show(
    paths: &[PathBuf],
    json: bool,
    signatures: Option<&Path>,
    jobs: usize,
    options: &DexOptions,
) -> Result<()> {
    let catalog = match signatures {
        Some(path) => SignatureCatalog::from_path(path)
            .with_context(|| format!("can't load signatures: {:?}", path))?,
        None => SignatureCatalog::new(),
    };
    debug!("loaded {} custom signatures", catalog.len());

    let files: Vec<PathBuf> = get_all_files(paths, &["dex"]).collect();
    let results = analyze_all(&files, &catalog, options, jobs);

    let mut snapshots = Vec::with_capacity(results.len());
    let mut failed = 0;
    for result in results {
        match result {
            Ok(snapshot) => snapshots.push(snapshot),
            Err(err) => {
                eprintln!("{:#}", err);
                failed += 1;
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
    } else {
        for (i, snapshot) in snapshots.iter().enumerate() {
            show(snapshot);

            // Add a newline between files except after the last one
            if i != snapshots.len() - 1 {
                println!();
            }
        }
    }

    if failed != 0 {
        bail!("{} of {} files failed", failed, files.len());
    }

    Ok(())
}

/// Parse files on up to `jobs` threads, keeping results in input order
fn analyze_all(
    files: &[PathBuf],
    catalog: &SignatureCatalog,
    options: &DexOptions,
    jobs: usize,
) -> Vec<Result<DexSnapshot>> {
    if files.is_empty() {
        return Vec::new();
    }

    let chunk_size = files.len().div_ceil(jobs.max(1));

    thread::scope(|scope| {
        let workers: Vec<_> = files
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(|path| analyze(path, catalog, options))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|worker| match worker.join() {
                Ok(results) => results,
                Err(_) => vec![Err(anyhow::anyhow!("worker thread panicked"))],
            })
            .collect()
    })
}

fn analyze(path: &Path, catalog: &SignatureCatalog, options: &DexOptions) -> Result<DexSnapshot> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let dex = Dex::from_path(path, name, catalog, options)
        .with_context(|| format!("got error while parsing dex: {:?}", path))?;

    Ok(dex.into_snapshot())
}

fn show(snapshot: &DexSnapshot) {
    println!("{}: {}", "Name", snapshot.name.green());
    println!("{}: {}", "Size", snapshot.size.to_string().green());
    println!("{}: {}", "Version", snapshot.header.version.to_string().green());
    println!("{}: {}", "MD5", snapshot.digests.md5.green());
    println!("{}: {}", "SHA1", snapshot.digests.sha1.green());
    println!("{}: {}", "SHA256", snapshot.digests.sha256.green());
    println!("{}: {}", "SHA512", snapshot.digests.sha512.green());
    println!(
        "{}: {} ({} omitted)",
        "Strings",
        snapshot.strings.len().to_string().green(),
        snapshot.omitted_strings
    );

    print_list("URLs", &snapshot.classification.urls);
    print_list("Shell commands", &snapshot.classification.shell_commands);
    print_list("Signatures", &snapshot.classification.custom_signatures);

    if !snapshot.inconsistencies.is_empty() {
        println!("\n{}:", "Inconsistencies".yellow().bold());
        for inconsistency in &snapshot.inconsistencies {
            println!("  {}", inconsistency.to_string().yellow());
        }
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        println!("{}: {}", title, "-".green());
        return;
    }

    println!("\n{}:", title.blue().bold());
    for item in items {
        println!("  {}", item.green());
    }
}
