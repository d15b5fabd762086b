#![no_main]

use dex_intel::{Classifier, SignatureCatalog};
use dex_intel_dex::DexFile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // must provide at least the magic
    if data.len() < 8 {
        return;
    }

    if let Ok(dex) = DexFile::with_limit(data, 1 << 16) {
        let catalog = SignatureCatalog::new();
        let _ = Classifier::new(&catalog).classify(dex.strings.strings());
    }
});
