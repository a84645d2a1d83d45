//! Coordinate reference system registry
//!
//! EPSG codes and their proj definition strings, loaded once from the
//! embedded `proj_registry.toml`. The elevation sources this tool is
//! pointed at disagree on which reference code is authoritative (3006
//! vs 5845), so the registry carries both and the caller always states
//! which one applies; no code is a hardcoded default.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

use crate::errors::{StormError, StormResult};

lazy_static! {
    static ref REGISTRY: CrsRegistry = {
        let content = include_str!("../../proj_registry.toml");
        CrsRegistry::from_str(content).unwrap_or_else(|e| {
            eprintln!("Warning: failed to parse projection registry: {}", e);
            CrsRegistry::default()
        })
    };
}

/// Registry of known coordinate reference systems
#[derive(Debug, Default)]
pub struct CrsRegistry {
    proj_strings: HashMap<u32, String>,
    names: HashMap<u32, String>,
    geographic: HashSet<u32>,
}

impl CrsRegistry {
    /// Parses the registry from a TOML string
    pub fn from_str(content: &str) -> StormResult<Self> {
        let value: toml::Value = content.parse()
            .map_err(|e| StormError::GenericError(format!("Invalid registry TOML: {}", e)))?;

        let mut registry = CrsRegistry::default();

        if let Some(table) = value.get("proj_strings").and_then(|v| v.as_table()) {
            for (code, proj) in table {
                if let (Ok(code), Some(proj)) = (code.parse::<u32>(), proj.as_str()) {
                    registry.proj_strings.insert(code, proj.to_string());
                }
            }
        }

        if let Some(table) = value.get("names").and_then(|v| v.as_table()) {
            for (code, name) in table {
                if let (Ok(code), Some(name)) = (code.parse::<u32>(), name.as_str()) {
                    registry.names.insert(code, name.to_string());
                }
            }
        }

        if let Some(codes) = value.get("geographic_codes").and_then(|v| v.as_array()) {
            for code in codes {
                if let Some(code) = code.as_integer() {
                    registry.geographic.insert(code as u32);
                }
            }
        }

        Ok(registry)
    }
}

/// Proj definition string for an EPSG code
pub fn proj_string(epsg: u32) -> StormResult<&'static str> {
    REGISTRY.proj_strings
        .get(&epsg)
        .map(|s| s.as_str())
        .ok_or(StormError::UnknownCrs(epsg))
}

/// Human-readable name for an EPSG code
pub fn name(epsg: u32) -> String {
    REGISTRY.names
        .get(&epsg)
        .cloned()
        .unwrap_or_else(|| format!("EPSG:{}", epsg))
}

/// Whether an EPSG code describes a geographic (degree-based) system
pub fn is_geographic(epsg: u32) -> bool {
    REGISTRY.geographic.contains(&epsg)
}

/// Whether an EPSG code is present in the registry
pub fn is_known(epsg: u32) -> bool {
    REGISTRY.proj_strings.contains_key(&epsg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_knows_the_pipeline_systems() {
        for code in [4326, 3857, 3006, 5845] {
            assert!(is_known(code), "EPSG:{} missing from registry", code);
        }
        assert!(!is_known(99999));
    }

    #[test]
    fn geographic_flag_is_degree_based_only() {
        assert!(is_geographic(4326));
        assert!(is_geographic(4258));
        assert!(!is_geographic(3006));
        assert!(!is_geographic(3857));
    }

    #[test]
    fn both_swedish_codes_share_a_projection() {
        assert_eq!(proj_string(3006).unwrap(), proj_string(5845).unwrap());
    }

    #[test]
    fn unknown_code_is_an_error() {
        assert!(matches!(proj_string(99999), Err(StormError::UnknownCrs(99999))));
    }
}
