use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let out_dir = match env::var("OUT_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };

    let generated = cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("OPPO_ADAPTER_H")
        .generate();

    // Header generation failures are not fatal.
    match generated {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("oppo_adapter.h"));
        }
        Err(err) => println!("cargo:warning=skipping C header generation: {err}"),
    }
}
