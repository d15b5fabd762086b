use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use dex_intel::{Dex, DexOptions, SignatureCatalog};

pub(crate) fn command_strings(path: &Path, options: &DexOptions) -> Result<()> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let dex = Dex::from_path(path, name, &SignatureCatalog::new(), options)
        .with_context(|| format!("got error while parsing dex: {:?}", path))?;

    let mut out = BufWriter::new(io::stdout().lock());
    for s in dex.strings() {
        // one string per line, so line breaks inside strings are escaped
        writeln!(out, "{}", s.escape_debug())?;
    }
    out.flush()?;

    for omitted in dex.omitted_strings() {
        eprintln!(
            "{}: string #{}: {}",
            "omitted".yellow(),
            omitted.index,
            omitted.error
        );
    }

    Ok(())
}
