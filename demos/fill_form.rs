//! Fill a PDF form from JSON
//! Run with: cargo run --example fill_form -- form.pdf [data.json] [output.pdf]
//!
//! Without a data file the form is filled with its own sample data.
//! Set RUST_LOG=debug to see how each field was classified.

use pdf_form::PdfForm;
use std::{env, fs};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let Some(input) = args.next() else {
        eprintln!("usage: fill_form <form.pdf> [data.json] [output.pdf]");
        std::process::exit(2);
    };
    let data_path = args.next();
    let output = args.next().unwrap_or_else(|| "output/filled.pdf".to_string());

    let form = PdfForm::new(&fs::read(&input)?)?;
    println!("{input}: {} pages, {} fields", form.page_count(), form.widgets().len());
    println!("{}", serde_json::to_string_pretty(&form.schema())?);

    let data = match data_path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => serde_json::Value::Object(form.sample_data()),
    };
    form.validate_data(&data)?;

    let filled = form.fill(&data, false)?;
    if let Some(parent) = std::path::Path::new(&output).parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = filled.to_bytes()?;
    fs::write(&output, &bytes)?;
    println!("Saved {} bytes -> {output}", bytes.len());

    Ok(())
}
