//! Environment readiness check.

use crate::cli::output::Style;
use crate::session::chromium;
use anyhow::Result;

/// Check Chromium availability and the artifacts directory.
pub async fn run() -> Result<()> {
    let s = Style::new();

    println!("Recon Doctor");
    println!("============");
    println!();

    // OS and architecture
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;
    println!("OS:   {os}");
    println!("Arch: {arch}");
    println!();

    // Check Chromium
    let chromium_path = chromium::find_chromium();
    match &chromium_path {
        Some(path) => println!("{} Chromium found: {}", s.ok_sym(), path.display()),
        None => println!(
            "{} Chromium NOT found. Install google-chrome or chromium, or set RECON_CHROMIUM_PATH.",
            s.fail_sym()
        ),
    }

    // Check artifacts directory
    let artifacts = chromium::artifacts_dir();
    let artifacts_ok = std::fs::create_dir_all(&artifacts).is_ok();
    if artifacts_ok {
        println!("{} Artifacts directory writable: {}", s.ok_sym(), artifacts.display());
    } else {
        println!(
            "{} Artifacts directory not writable: {} (screenshots will be inlined)",
            s.warn_sym(),
            artifacts.display()
        );
    }

    println!();
    let ready = chromium_path.is_some();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
        println!("  Install Chromium or set RECON_CHROMIUM_PATH to its binary.");
    }

    Ok(())
}
