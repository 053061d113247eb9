//! Expands configured runs and case-hit reference rows into one [`Run`]
//! per seller and destination tab.

use crate::config::RunConfig;
use crate::rows::CaseHit;
use crate::types::Run;

/// Tab that lists the case hits to search for.
pub const CASE_HITS_TAB: &str = "CASE HITS";

/// Appended to every case-hit search: cheap auctions only.
pub const CASE_HIT_QUERY_SUFFIX: &str =
    "&limit=200&filter=price:[..10],priceCurrency:USD,buyingOptions:{AUCTION}";

/// Scope `query` to one seller. The seller clause goes right after the first
/// filter term when the query has a `filter=` with more than one term, and
/// at the end otherwise.
pub fn inject_seller(query: &str, seller: &str) -> String {
    let clause = format!(",sellers:{{{seller}}}");
    let insert_at = query
        .find("filter=")
        .and_then(|start| query[start..].find(',').map(|comma| start + comma));
    match insert_at {
        Some(idx) => {
            let mut out = String::with_capacity(query.len() + clause.len());
            out.push_str(&query[..idx]);
            out.push_str(&clause);
            out.push_str(&query[idx..]);
            out
        }
        None => format!("{query}{clause}"),
    }
}

/// One run per (seller, configured run), sellers outermost.
pub fn plan_runs(runs: &[RunConfig], sellers: &[String]) -> Vec<Run> {
    sellers
        .iter()
        .flat_map(|seller| {
            runs.iter().map(move |run| Run {
                tab_name: format!("{} - {}", run.sheet, seller),
                seller: seller.clone(),
                queries: run.queries.iter().map(|q| inject_seller(q, seller)).collect(),
            })
        })
        .collect()
}

pub fn case_hit_query(hit: &CaseHit) -> String {
    let terms = format!("{} {} {}", hit.sport, hit.name, hit.set);
    format!("{}{}", terms.trim(), CASE_HIT_QUERY_SUFFIX)
}

/// One `CASE HITS - {seller}` run per seller, one query per case hit.
pub fn plan_case_hit_runs(case_hits: &[CaseHit], sellers: &[String]) -> Vec<Run> {
    let queries: Vec<String> = case_hits.iter().map(case_hit_query).collect();
    sellers
        .iter()
        .map(|seller| Run {
            tab_name: format!("{CASE_HITS_TAB} - {seller}"),
            seller: seller.clone(),
            queries: queries.iter().map(|q| inject_seller(q, seller)).collect(),
        })
        .collect()
}
