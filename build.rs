fn main() {
    // HACK(eddyb) disable the default of re-running the build script on *any*
    // change to *the entire source tree* (i.e. the default is roughly `./`).
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = std::path::PathBuf::from(std::env::var_os("CARGO_MANIFEST_DIR").unwrap());
    let grammar_dir = manifest_dir.join("grammar");
    println!("cargo:rerun-if-changed={}", grammar_dir.display());

    if !std::fs::metadata(&grammar_dir).map_or(false, |m| m.is_dir()) {
        eprintln!(" error: {} is not a directory", grammar_dir.display());
        eprintln!("  note: the `grammar/` directory holds the SPIR-V grammar JSON files");
        std::process::exit(1);
    }

    let core_grammar = "spirv.core.grammar.json";
    let mut extinsts_names_and_grammars: Vec<_> = std::fs::read_dir(&grammar_dir)
        .unwrap()
        .filter_map(|e| {
            let file_name = e.unwrap().file_name();
            Some((
                file_name
                    .to_str()?
                    .strip_prefix("extinst.")?
                    .strip_suffix(".grammar.json")?
                    .to_string(),
                file_name,
            ))
        })
        .collect();
    extinsts_names_and_grammars.sort();

    for (_, file_name) in &extinsts_names_and_grammars {
        println!("cargo:rerun-if-changed={}", grammar_dir.join(file_name).display());
    }
    println!("cargo:rerun-if-changed={}", grammar_dir.join(core_grammar).display());

    let all_jsons = format!(
        "pub(super) const SPIRV_CORE_GRAMMAR: &str = include_str!({:?});\n\
         pub(super) const EXTINST_NAMES_AND_GRAMMARS: &[(&str, &str)] = &[\n{}];",
        grammar_dir.join(core_grammar),
        extinsts_names_and_grammars
            .into_iter()
            .map(|(name, grammar)| {
                format!("({:?}, include_str!({:?})),\n", name, grammar_dir.join(grammar))
            })
            .collect::<String>()
    );
    std::fs::write(
        std::path::PathBuf::from(std::env::var_os("OUT_DIR").unwrap()).join("spv_grammar_jsons.rs"),
        all_jsons,
    )
    .unwrap();
}
