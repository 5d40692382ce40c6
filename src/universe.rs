//! Symbol universe resolution
//!
//! Command-line arguments are either plain tickers (`AAPL`) or references
//! to a named universe from configuration (`^SP50`).

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::common::errors::{ClientError, Result};

/// Prefix marking a named universe
pub const UNIVERSE_PREFIX: char = '^';

/// Expand arguments into a deduplicated, uppercased ticker list
///
/// Order follows first appearance. Universe names match case-insensitively.
pub fn resolve(args: &[String], universes: &HashMap<String, Vec<String>>) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut symbols = Vec::new();

    for arg in args {
        let arg = arg.trim();
        if arg.is_empty() {
            continue;
        }

        let expanded: Vec<String> = match arg.strip_prefix(UNIVERSE_PREFIX) {
            Some(name) => {
                let members = lookup(name, universes)?;
                debug!(universe = name, count = members.len(), "Expanded universe");
                members.to_vec()
            }
            None => vec![arg.to_string()],
        };

        for symbol in expanded {
            let symbol = symbol.trim().to_ascii_uppercase();
            if !symbol.is_empty() && seen.insert(symbol.clone()) {
                symbols.push(symbol);
            }
        }
    }

    Ok(symbols)
}

fn lookup<'a>(name: &str, universes: &'a HashMap<String, Vec<String>>) -> Result<&'a [String]> {
    universes
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, members)| members.as_slice())
        .ok_or_else(|| {
            let mut known: Vec<_> = universes.keys().map(String::as_str).collect();
            known.sort_unstable();
            ClientError::Configuration(format!(
                "unknown universe {}{}; configured: [{}]",
                UNIVERSE_PREFIX,
                name,
                known.join(", ")
            ))
        })
}
