use codegraph_api::GraphSnapshot;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schemars::schema_for!(GraphSnapshot);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
