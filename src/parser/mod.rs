pub mod amount;
pub mod title;

pub use amount::{format_amount, format_dollars, parse_dollar_amount};
pub use title::{
    format_url, parse_auto, parse_case_hit, parse_out_of, parse_patch, parse_psa, parse_rookie,
    parse_title, parse_year, NOT_NUMBERED,
};
