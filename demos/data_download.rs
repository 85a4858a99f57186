//! Example demonstrating how to download the address-formatting
//! configuration.
//!
//! This example shows how to:
//! 1. Locate the configuration directory
//! 2. Download and extract the configuration when it is missing
//! 3. Verify the files and load them
//!
//! Run with: RUST_LOG=info cargo run --example data_download --features runtime-data

use address_formatter::{AddressFormatter, Result, data::DataManager};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();

    println!("=== address-formatter Data Download Example ===\n");

    let data_manager = DataManager::new();
    println!("Data directory: {}", data_manager.data_dir().display());
    println!("Data available: {}\n", data_manager.is_data_available());

    if data_manager.is_data_available() {
        println!("1. Configuration is already available");
    } else {
        println!("1. Configuration not found. Downloading from {}", data_manager.config().base_url);
        data_manager.ensure_data().await?;
        println!("   Download completed");
    }

    match data_manager.verify_data() {
        Ok(()) => println!("2. Verification passed"),
        Err(e) => println!("2. Verification failed: {e}"),
    }

    match data_manager.data_size() {
        Ok(size) => println!("   Data size: {:.1} KB", size as f64 / 1024.0),
        Err(e) => println!("   Could not calculate data size: {e}"),
    }

    println!("\n3. Loading configuration");
    let formatter = AddressFormatter::from_dir(data_manager.data_dir())?;
    println!("   Loaded {} templates", formatter.config().template_count());

    Ok(())
}
