//! Presentation of blocks for listings.
//!
//! Anyone may browse the chain, but the public listing hides who issued each
//! document and when. Genesis is always shown in full.

use crate::blockchain::Block;
use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

pub const CENSORED_TIMESTAMP: &str = "*** ** **** - **:** **";
const TIMESTAMP_FORMAT: &str = "%B %d, %Y - %I:%M %p";
const DATE_FORMAT: &str = "%B %d, %Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Authenticated,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockView {
    pub index: u64,
    pub timestamp: f64,
    pub formatted_timestamp: String,
    pub document_type: String,
    pub issuer: String,
    pub student_name: String,
    pub cert_id: String,
    pub validity: String,
    pub student_image: String,
    pub document_hash: String,
    pub previous_hash: String,
    pub block_hash: String,
}

impl BlockView {
    pub fn new(block: &Block, visibility: Visibility) -> Self {
        Self::new_in(block, visibility, &Local)
    }

    pub fn new_in<Tz: TimeZone>(block: &Block, visibility: Visibility, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let redact = visibility == Visibility::Public && !block.is_genesis();
        let (issuer, formatted_timestamp) = if redact {
            (censor_name(block.issuer()), CENSORED_TIMESTAMP.to_string())
        } else {
            (
                block.issuer().to_string(),
                format_timestamp_in(block.timestamp(), TIMESTAMP_FORMAT, tz),
            )
        };

        BlockView {
            index: block.index(),
            timestamp: block.timestamp(),
            formatted_timestamp,
            document_type: block.document_type().to_string(),
            issuer,
            student_name: block.student_name().to_string(),
            cert_id: block.cert_id().to_string(),
            validity: block.validity().to_string(),
            student_image: block.student_image().to_string(),
            document_hash: block.document_hash().to_string(),
            previous_hash: block.previous_hash().to_string(),
            block_hash: block.block_hash().to_string(),
        }
    }
}

/// Views for a whole chain.
pub fn chain_views(blocks: &[Block], visibility: Visibility) -> Vec<BlockView> {
    blocks.iter().map(|b| BlockView::new(b, visibility)).collect()
}

/// Keeps the first and last letter of each word and stars out the rest.
/// Two-letter words keep only their first letter.
pub fn censor_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let chars: Vec<char> = word.chars().collect();
            match chars.len() {
                0 | 1 => word.to_string(),
                2 => format!("{}*", chars[0]),
                n => format!("{}{}{}", chars[0], "*".repeat(n - 2), chars[n - 1]),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Calendar date of a block timestamp in local time, e.g. "March 04, 2024".
pub fn format_date(timestamp: f64) -> String {
    format_timestamp_in(timestamp, DATE_FORMAT, &Local)
}

fn format_timestamp_in<Tz: TimeZone>(timestamp: f64, format: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    match DateTime::from_timestamp(secs as i64, nanos) {
        Some(utc) => utc.with_timezone(tz).format(format).to_string(),
        None => format!("{}", timestamp),
    }
}
