//! Utility to re-render a stored label's images to PNG files
//!
//! Usage: regenerate_label <label_code> [output_dir] [--descriptive]

use std::path::PathBuf;

use weighlab::config::Config;
use weighlab::db::Database;
use weighlab::label::LabelEncoder;
use weighlab::models::Label;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let descriptive = match args.iter().position(|a| a == "--descriptive") {
        Some(i) => {
            args.remove(i);
            true
        }
        None => false,
    };
    let Some(label_code) = args.first().cloned() else {
        eprintln!("Usage: regenerate_label <label_code> [output_dir] [--descriptive]");
        std::process::exit(2);
    };
    let out_dir = args.get(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    let config = Config::from_env()?;
    let database = Database::open_migrated(&config.database_path)?;
    let label = database
        .with_conn(|conn| Label::get_by_code(conn, &label_code))?
        .ok_or_else(|| format!("Label not found: {}", label_code))?;

    let encoder = LabelEncoder::new(config.encoder);
    let matrix_payload = if descriptive {
        label.descriptive_payload()
    } else {
        label.label_code.clone()
    };
    let matrix_png = encoder.encode_matrix(&matrix_payload)?;
    let linear_png = encoder.encode_linear(&label.label_code)?;

    std::fs::create_dir_all(&out_dir)?;
    let qr_path = out_dir.join(format!("{}-qr.png", label.label_code));
    let barcode_path = out_dir.join(format!("{}-barcode.png", label.label_code));
    std::fs::write(&qr_path, matrix_png)?;
    std::fs::write(&barcode_path, linear_png)?;

    println!("Label {}:", label.label_code);
    println!("  {} | {} | {}", label.compound_name, label.cas_number, label.concentration);
    println!("  Prepared by {} on {}", label.prepared_by, label.date);
    println!("  QR code: {}", qr_path.display());
    println!("  Barcode: {}", barcode_path.display());

    Ok(())
}
