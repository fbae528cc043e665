use schemars::schema_for;
use strata_core::TableMeta;

fn main() {
    let schema = schema_for!(Vec<TableMeta>);
    let json = serde_json::to_string_pretty(&schema).expect("serialize json schema");
    println!("{json}");
}
