//! Utility to add a compound to the catalog
//!
//! Usage: add_compound <name> <cas_number> <stock> <stock_unit> [critical] [critical_unit] [solvent]

use weighlab::config::Config;
use weighlab::db::Database;
use weighlab::measure::parse_numeric;
use weighlab::models::{Compound, CompoundCreate};

const USAGE: &str =
    "Usage: add_compound <name> <cas_number> <stock> <stock_unit> [critical] [critical_unit] [solvent]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 4 {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }
    let arg = |i: usize| args.get(i).map(String::as_str);

    let data = CompoundCreate {
        name: args[0].clone(),
        cas_number: args[1].clone(),
        stock_value: parse_numeric(&args[2], f64::NAN),
        stock_unit: args[3].clone(),
        critical_value: arg(4).map_or(0.0, |v| parse_numeric(v, f64::NAN)),
        critical_unit: arg(5).unwrap_or("mg").to_string(),
        solvent: arg(6).unwrap_or_default().to_string(),
    };

    let config = Config::from_env()?;
    let db_path = config.database_path;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    println!("Database path: {}", db_path.display());

    let database = Database::open_migrated(&db_path)?;
    let conn = database.get_conn()?;
    let compound = Compound::create(&conn, &data)?;

    println!("Compound added:");
    println!("  ID: {}", compound.id);
    println!("  Name: {}", compound.name);
    println!("  CAS: {}", compound.cas_number);
    println!("  Stock: {} {}", compound.stock_value(), compound.stock_unit);
    println!("  Critical: {} {}", compound.critical_value(), compound.critical_unit);
    if !compound.solvent.is_empty() {
        println!("  Solvent: {}", compound.solvent);
    }

    Ok(())
}
