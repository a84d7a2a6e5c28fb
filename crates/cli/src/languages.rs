pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let registry = codegraph_runtime::build_default_registry();
    for (language, extensions) in registry.supported_extensions() {
        let extensions: Vec<String> = extensions.iter().map(|e| format!(".{}", e)).collect();
        println!("{:<12} {}", language, extensions.join(" "));
    }
    Ok(())
}
