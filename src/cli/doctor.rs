//! Environment readiness check.

use crate::renderer::chromium::find_chromium;
use anyhow::Result;

/// Check Chromium availability and report readiness.
pub async fn run() -> Result<()> {
    println!("Vitrine Doctor");
    println!("==============");
    println!();

    // OS and architecture
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    // Check Chromium
    let chromium_path = find_chromium();
    match &chromium_path {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Chrome/Chromium or set VITRINE_CHROMIUM_PATH."
        ),
    }

    println!();
    if chromium_path.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
