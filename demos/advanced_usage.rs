//! Advanced usage example for address-formatter.
//!
//! This example demonstrates advanced features:
//! - Custom configuration with the async constructor
//! - Building a configuration in memory
//! - Batch formatting and performance measurement
//!
//! Run with: cargo run --example advanced_usage --features parallel

use address_formatter::{
    AddressConfig, AddressFormatter, CodeTable, ComponentDefinition, Components, Error,
    FormatterConfig, StateMatch, Template, TerritoryOverride,
};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Error> {
    pretty_env_logger::init();

    println!("address-formatter Advanced Usage Example");
    println!("========================================\n");

    // Example 1: Custom configuration
    println!("1. Custom Configuration");
    println!("----------------------");

    let config = FormatterConfig::builder()
        .data_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/conf"))
        .auto_download_data(false)
        .verify_data_integrity(true)
        .build();

    let formatter = AddressFormatter::with_config(config).await?;
    println!("✓ Formatter initialized with {} templates\n", formatter.config().template_count());

    // Example 2: In-memory configuration
    println!("2. In-Memory Configuration");
    println!("--------------------------");

    let in_memory = AddressConfig::builder()
        .template(
            "default",
            Template::builder()
                .address_template("{{{attention}}}\n{{{house_number}}} {{{road}}}\n{{{city}}}, {{{state_code}}}\n{{{country}}}")
                .build()?,
        )
        .template(
            "YY",
            Template::builder()
                .address_template("{{{house_number}}} {{{road}}}\n{{{city}}} {{{state_code}}}\n{{{country}}}")
                .build()?,
        )
        .template(
            "XX",
            Template::builder()
                .use_country("YY")
                .change_country("$state, Example Federation")
                .build()?,
        )
        .components([
            ComponentDefinition::new("road", ["street"]),
            ComponentDefinition::new("city", ["town"]),
            ComponentDefinition::new("house_number", Vec::<String>::new()),
            ComponentDefinition::new("state", Vec::<String>::new()),
            ComponentDefinition::new("state_code", Vec::<String>::new()),
            ComponentDefinition::new("country", Vec::<String>::new()),
            ComponentDefinition::new("country_code", Vec::<String>::new()),
        ])
        .state_codes(CodeTable::new().with("YY", "NT", "Northern Territory"))
        .territory(
            "YY",
            TerritoryOverride::new(StateMatch::IgnoreCase("island territory".into()), "XI", "Island Territory"),
        )
        .build()?;
    let custom = AddressFormatter::from_config(in_memory);

    let components: Components = [
        ("house_number", "7"),
        ("street", "Harbour Road"),
        ("town", "Port Town"),
        ("state", "Northern Territory"),
        ("country_code", "xx"),
    ]
    .into_iter()
    .collect();
    println!("{}\n", custom.format_address(components));

    // Example 3: Batch formatting
    println!("3. Batch Formatting");
    println!("-------------------");

    let batch: Vec<Components> = (1..=1000)
        .map(|i| {
            [
                ("house_number", i.to_string()),
                ("road", "Unter den Linden".to_string()),
                ("postcode", "10117".to_string()),
                ("city", "Berlin".to_string()),
                ("country_code", "de".to_string()),
            ]
            .into_iter()
            .collect()
        })
        .collect();

    let start = Instant::now();
    let formatted = formatter.format_batch(&batch);
    println!("Formatted {} addresses in {:?}", formatted.len(), start.elapsed());

    #[cfg(feature = "parallel")]
    {
        let start = Instant::now();
        let parallel = formatter.format_batch_parallel(&batch);
        println!("Formatted {} addresses in parallel in {:?}", parallel.len(), start.elapsed());
        assert_eq!(parallel, formatted);
    }

    println!("\nFirst result:\n{}", formatted[0]);
    Ok(())
}
