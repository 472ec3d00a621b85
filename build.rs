use std::path::Path;

// Records the enabled cargo features so `docsafe info` can report them.
fn main() -> std::io::Result<()> {
    println!("cargo:rerun-if-changed=build.rs");
    let mut features: Vec<String> = std::env::vars()
        .filter_map(|(key, _)| key.strip_prefix("CARGO_FEATURE_").map(|f| f.to_ascii_lowercase().replace('_', "-")))
        .collect();
    features.sort();
    let quoted: Vec<String> = features.iter().map(|f| format!("{f:?}")).collect();
    let out_dir = std::env::var_os("OUT_DIR").ok_or_else(|| std::io::Error::other("OUT_DIR is not set"))?;
    std::fs::write(
        Path::new(&out_dir).join("compiled_features.rs"),
        format!("pub static COMPILED_FEATURES: &[&str] = &[{}];\n", quoted.join(", ")),
    )
}
