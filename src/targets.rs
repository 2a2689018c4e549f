// src/targets.rs
//! Target resolution: which sites to crawl for a profile, plus the keyword taxonomy
//! returned alongside the results as relevance hints.

use serde::{Deserialize, Serialize};

use crate::profile::UserProfile;

/// Sites crawled for every profile, in crawl order.
pub const BASE_URLS: [&str; 4] = [
    "https://www.bct.gov.tn",
    "http://www.cmf.tn",
    "https://www.ilboursa.com",
    "https://www.leconomistemaghrebin.com",
];

/// Added when the profile lists the `AI` interest.
pub const AI_URL: &str = "https://www.forbes.com/ai";

pub const AI_INTEREST: &str = "AI";
pub const AI_KEYWORD: &str = "AI investment";

pub const REAL_ESTATE_INTEREST: &str = "real estate";
pub const REAL_ESTATE_HOLDING: &str = "houses in Gabes";
pub const REAL_ESTATE_KEYWORD: &str = "real estate investment";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordTaxonomy {
    pub financial_news: Vec<String>,
    pub opportunities: Vec<String>,
    pub anomalies: Vec<String>,
    pub regulations: Vec<String>,
}

impl KeywordTaxonomy {
    pub fn base() -> Self {
        fn owned(xs: &[&str]) -> Vec<String> {
            xs.iter().map(|s| s.to_string()).collect()
        }
        Self {
            financial_news: owned(&[
                "inflation",
                "interest rate",
                "gdp",
                "unemployment",
                "economic growth",
                "bourse de tunis",
                "tunindex",
            ]),
            opportunities: owned(&[
                "investment opportunity",
                "market alert",
                "ipo",
                "startup funding",
                "fintech innovation",
            ]),
            anomalies: owned(&[
                "risk",
                "security event",
                "volatility",
                "market manipulation",
                "fraud",
                "cybersecurity threat",
            ]),
            regulations: owned(&[
                "bct",
                "cmf",
                "regulatory update",
                "financial regulation",
                "compliance",
            ]),
        }
    }
}

/// URLs to crawl plus the taxonomy, both built fresh per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Targets {
    pub urls: Vec<String>,
    pub taxonomy: KeywordTaxonomy,
}

/// Base lists plus profile-conditional additions. Rules only append.
///
/// The real-estate rule touches the taxonomy but adds no URL.
pub fn resolve(profile: &UserProfile) -> Targets {
    let mut urls: Vec<String> = BASE_URLS.iter().map(|u| u.to_string()).collect();
    let mut taxonomy = KeywordTaxonomy::base();

    if profile.has_interest(REAL_ESTATE_INTEREST)
        && profile.owns().iter().any(|o| *o == REAL_ESTATE_HOLDING)
    {
        taxonomy.opportunities.push(REAL_ESTATE_KEYWORD.to_string());
    }

    if profile.has_interest(AI_INTEREST) {
        urls.push(AI_URL.to_string());
        taxonomy.opportunities.push(AI_KEYWORD.to_string());
    }

    Targets { urls, taxonomy }
}
