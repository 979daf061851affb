//! Types command
//!
//! Usage: apitester types [--json]

use apitester_core::default_entity_types;
use clap::Args;

#[derive(Debug, Args)]
pub struct TypesArgs {
    /// Print the catalog as a JSON array
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: TypesArgs) -> anyhow::Result<()> {
    let types = default_entity_types();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&types)?);
        return Ok(());
    }

    for entity_type in types {
        println!("{}\t{}", entity_type.id, entity_type.name);
    }
    Ok(())
}
