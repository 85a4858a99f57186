//! Basic usage example for address-formatter.
//!
//! This example demonstrates the core functionality of the library:
//! - Loading a configuration directory
//! - Formatting geocoder components into postal addresses
//! - Guessing venue names from unrecognized components
//!
//! Run with: cargo run --example basic_usage [conf-dir]

use address_formatter::{AddressFormatter, Components, Error};

fn main() -> Result<(), Error> {
    pretty_env_logger::init();

    println!("address-formatter Basic Usage Example");
    println!("=====================================\n");

    let conf_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/conf").to_string());
    println!("Loading configuration from {conf_dir}...");
    let formatter = AddressFormatter::from_dir(&conf_dir)?;
    println!("Loaded {} templates\n", formatter.config().template_count());

    // Example 1: A complete street address
    println!("1. Street Address");
    println!("-----------------");

    let components: Components = [
        ("house_number", "301"),
        ("road", "Congress Avenue"),
        ("city", "Austin"),
        ("state", "Texas"),
        ("postcode", "78701"),
        ("country", "United States of America"),
        ("country_code", "us"),
    ]
    .into_iter()
    .collect();
    println!("{}\n", formatter.format_address(components));

    // Example 2: Aliases and a venue name
    println!("2. Aliases and Venue Names");
    println!("--------------------------");

    let components: Components = [
        ("viewpoint", "Tour Eiffel 3e étage"),
        ("street", "Avenue Gustave Eiffel"),
        ("suburb", "Gros-Caillou"),
        ("town", "Paris"),
        ("postcode", "75007"),
        ("country", "France"),
        ("country_code", "fr"),
    ]
    .into_iter()
    .collect();

    println!("Name: {:?}", formatter.guess_name(components.clone()));
    println!("Unknown types: {:?}", formatter.guess_type_candidates(components.clone()));
    println!("{}\n", formatter.format_address(components));

    // Example 3: Sparse components use the fallback template
    println!("3. Fallback Template");
    println!("--------------------");

    let components: Components = [("city", "Berlin"), ("state", "Berlin"), ("country_code", "de")]
        .into_iter()
        .collect();
    println!("{}\n", formatter.format_address(components));

    println!("All examples completed successfully!");
    Ok(())
}
