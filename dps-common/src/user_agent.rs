//! `User-Agent` strings.
//!
//! Every request carries `<package>/<version> (<os>; <arch>)`, optionally
//! followed by a product-info string chosen by the application. The version
//! is the calling crate's, so callers pass `env!("CARGO_PKG_VERSION")`.

use std::env::consts::{ARCH, OS};

/// The user agent sent by device registration clients at `version`.
pub fn device_user_agent(version: &str, product_info: Option<&str>) -> String {
    build("dps-device", version, product_info)
}

/// The user agent sent by the enrollment service client at `version`.
pub fn service_user_agent(version: &str) -> String {
    build("dps-service", version, None)
}

fn build(package: &str, version: &str, product_info: Option<&str>) -> String {
    let mut agent = format!("{}/{} ({}; {})", package, version, OS, ARCH);
    if let Some(info) = product_info.map(str::trim).filter(|info| !info.is_empty()) {
        agent.push(' ');
        agent.push_str(info);
    }
    agent
}
