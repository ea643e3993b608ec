//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `recordkit_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("recordkit_core ping={}", recordkit_core::ping());
    println!("recordkit_core version={}", recordkit_core::core_version());
}
