//! Build and environment details appended to every report.

use serde::Serialize;
use std::fmt;

/// A direct dependency and the version requirement it was built against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyInfo {
    pub name: &'static str,
    pub version: &'static str,
}

const DEPENDENCIES: [(&str, &str); 8] = [
    ("faer", "0.22"),
    ("statrs", "0.18"),
    ("thiserror", "2.0"),
    ("tracing", "0.1"),
    ("tracing-subscriber", "0.3"),
    ("serde", "1.0"),
    ("serde_json", "1.0"),
    ("clap", "4.5"),
];

/// Crate version, target platform and dependency versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    pub package: &'static str,
    pub version: &'static str,
    pub target_os: &'static str,
    pub target_arch: &'static str,
    pub profile: &'static str,
    pub dependencies: Vec<DependencyInfo>,
}

impl SessionInfo {
    pub fn collect() -> Self {
        Self {
            package: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            target_os: std::env::consts::OS,
            target_arch: std::env::consts::ARCH,
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
            dependencies: DEPENDENCIES
                .iter()
                .map(|&(name, version)| DependencyInfo { name, version })
                .collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for SessionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.package, self.version)?;
        writeln!(f, "Platform: {}-{} ({})", self.target_arch, self.target_os, self.profile)?;
        writeln!(f)?;
        writeln!(f, "Dependencies:")?;
        for dep in &self.dependencies {
            writeln!(f, "  {:<20}{}", dep.name, dep.version)?;
        }
        Ok(())
    }
}
