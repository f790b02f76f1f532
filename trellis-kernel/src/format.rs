//! Tools for formatting round graph types for logging and debugging.

use std::fmt::Write;

use trellis_common::Hash;

use crate::{CacheRound, FinalRound, RoundGraph};

/// Format a Hash as its first 8 hex digits
pub fn format_hash_short(hash: &Hash) -> String {
    let mut s = hash.to_string();
    s.truncate(8);
    s
}

/// Format a CacheRound in a concise way
pub fn format_cache_round(round: &CacheRound, verbose: bool) -> String {
    if verbose {
        format!(
            "CacheRound{{ node: {}, number: {}, start: {}, end: {}, references: [{}, {}], snapshots: {} }}",
            round.node_id,
            round.number,
            round.start,
            round.end,
            round.references[0],
            round.references[1],
            round.snapshots.len()
        )
    } else {
        format!(
            "Cache[{},r{},{}..{},{} snaps]",
            format_hash_short(&round.node_id),
            round.number,
            round.start,
            round.end,
            round.snapshots.len()
        )
    }
}

/// Format a FinalRound in a concise way
pub fn format_final_round(round: &FinalRound, verbose: bool) -> String {
    if verbose {
        format!(
            "FinalRound{{ node: {}, number: {}, start: {}, end: {}, hash: {} }}",
            round.node_id, round.number, round.start, round.end, round.hash
        )
    } else {
        format!(
            "Final[{},r{},{}..{},#{}]",
            format_hash_short(&round.node_id),
            round.number,
            round.start,
            round.end,
            format_hash_short(&round.hash)
        )
    }
}

/// The diagnostic dump: one block per validator, between header and footer
/// markers. Not a stable format.
pub fn format_round_graph(graph: &RoundGraph) -> String {
    let mut desc = String::from("ROUND GRAPH BEGIN\n");
    for id in graph.nodes() {
        let _ = writeln!(desc, "NODE# {}", id);
        match graph.final_round(id) {
            Some(f) => {
                let _ = writeln!(desc, "FINAL {} {} {}", f.number, f.start, f.hash);
            }
            None => desc.push_str("FINAL -\n"),
        }
        match graph.cache_round(id) {
            Some(c) => {
                let _ = writeln!(desc, "CACHE {} {}", c.number, c.start);
            }
            None => desc.push_str("CACHE -\n"),
        }
    }
    desc.push_str("ROUND GRAPH END");
    desc
}
