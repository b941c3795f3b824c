// build.rs

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

fn read_locale(lang: &str) -> Option<BTreeMap<String, String>> {
    let path = format!("locales/{}.toml", lang);
    let content = fs::read_to_string(&path).ok()?;
    println!("cargo:rerun-if-changed={}", path);
    Some(toml::from_str(&content).expect("locale files must map quoted keys to strings"))
}

fn main() {
    println!("cargo:rerun-if-env-changed=MSH_LANG");
    println!("cargo:rerun-if-changed=locales/");

    // A `lang_*` feature wins over MSH_LANG.
    let lang = env::vars()
        .filter_map(|(key, _)| key.strip_prefix("CARGO_FEATURE_LANG_").map(str::to_lowercase))
        .min()
        .or_else(|| env::var("MSH_LANG").ok())
        .unwrap_or_else(|| "en".to_string());

    let mut messages = read_locale("en").expect("locales/en.toml is required");
    if lang != "en" {
        match read_locale(&lang) {
            Some(overrides) => messages.extend(overrides),
            None => println!("cargo:warning=No locales/{}.toml, using English.", lang),
        }
    }

    let mut code = String::from("#[macro_export]\nmacro_rules! t {\n");
    for (key, value) in &messages {
        code.push_str(&format!("    ({:?}) => {{ {:?} }};\n", key, value));
    }
    code.push_str("    ($key:expr) => { compile_error!(concat!(\"Missing message: \", $key)) };\n}\n");

    let out_dir = env::var("OUT_DIR").expect("cargo sets OUT_DIR");
    fs::write(Path::new(&out_dir).join("translations.rs"), code)
        .expect("Failed to write translations.rs");
}
