use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use scraper::{ElementRef, Html, Selector};

use crate::collectors::{CardSkip, Extraction, JobCollector};
use crate::error::AppError;
use crate::models::job::{JobRecord, SENTINEL};
use crate::models::seen::SeenSet;

/// Characters that encodeURIComponent does NOT encode.
/// RFC 3986 unreserved: A-Z a-z 0-9 - _ . ! ~ * ' ( )
const ENCODE_URI_COMPONENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const SITE_ORIGIN: &str = "https://www.upwork.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Error local to one card. The card is skipped, the batch continues.
#[derive(Debug, thiserror::Error)]
enum CardError {
    #[error("<{tag}> element is missing its '{attr}' attribute")]
    AttrMissing {
        tag: &'static str,
        attr: &'static str,
    },
}

/// Collector for Upwork's search-results page.
pub struct Upwork {
    client: reqwest::Client,
    selectors: Selectors,
}

/// Selectors are compiled once at construction; the page is polled often.
struct Selectors {
    card_primary: Selector,
    card_fallback: Selector,
    title: Selector,
    link: Selector,
    posted: Selector,
    location: Selector,
    description: Selector,
    experience: Selector,
    budget: Selector,
    project_type: Selector,
    contract_type: Selector,
    skills: Selector,
    activity: Selector,
    client_info: Selector,
}

fn sel(input: &str) -> Result<Selector, AppError> {
    Selector::parse(input).map_err(|e| AppError::Internal(format!("bad selector '{input}': {e}")))
}

impl Selectors {
    fn new() -> Result<Self, AppError> {
        Ok(Self {
            card_primary: sel(r#"section[data-test="job-tile-list"]"#)?,
            card_fallback: sel("article.job-tile")?,
            title: sel("h4")?,
            link: sel("a[href]")?,
            posted: sel("time")?,
            location: sel(r#"span[data-test="client-location"]"#)?,
            description: sel(r#"span[data-test="job-description-text"]"#)?,
            experience: sel(r#"span[data-test="job-experience-level"]"#)?,
            budget: sel(r#"span[data-test="job-budget"]"#)?,
            project_type: sel(r#"span[data-test="job-type"]"#)?,
            contract_type: sel(r#"span[data-test="job-contract-type"]"#)?,
            skills: sel(r#"a[data-test="skill-tag"]"#)?,
            activity: sel(r#"span[data-test="job-activity"]"#)?,
            client_info: sel(r#"div[data-test="client-info"]"#)?,
        })
    }
}

impl Upwork {
    pub fn new() -> Result<Self, AppError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            selectors: Selectors::new()?,
        })
    }

    fn search_url(&self, niche: &str) -> String {
        format!(
            "{SITE_ORIGIN}/nx/jobs/search/?q={}&sort=recency",
            urlencoded(niche)
        )
    }

    /// Extract all cards from a fetched page body, dropping listings whose
    /// link is already in `seen`. Surviving records keep document order.
    fn parse(&self, body: &str, seen: &mut SeenSet) -> Extraction {
        let document = Html::parse_document(body);

        // The page is adversarially versioned; when the primary card
        // selector comes up empty, retry with the older markup shape.
        let cards: Vec<ElementRef> = {
            let primary: Vec<ElementRef> = document.select(&self.selectors.card_primary).collect();
            if primary.is_empty() {
                document.select(&self.selectors.card_fallback).collect()
            } else {
                primary
            }
        };

        let mut records = Vec::new();
        let mut skipped = Vec::new();

        for (index, card) in cards.into_iter().enumerate() {
            match self.parse_card(card) {
                Ok(record) => {
                    if seen.contains(&record.link) {
                        continue;
                    }
                    seen.insert(record.link.clone());
                    records.push(record);
                }
                Err(e) => skipped.push(CardSkip {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        Extraction { records, skipped }
    }

    /// Build one record from a card fragment. A sub-query with no match
    /// resolves to the sentinel; a structural error fails the whole card.
    fn parse_card(&self, card: ElementRef) -> Result<JobRecord, CardError> {
        let s = &self.selectors;

        let link = card
            .select(&s.link)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(|href| format!("{SITE_ORIGIN}{href}"))
            .unwrap_or_else(|| SENTINEL.to_string());

        // A <time> element without a datetime attribute means the card's
        // structure is not what we expect; skip the card entirely.
        let posted_time = match card.select(&s.posted).next() {
            Some(el) => el
                .value()
                .attr("datetime")
                .ok_or(CardError::AttrMissing {
                    tag: "time",
                    attr: "datetime",
                })?
                .to_string(),
            None => SENTINEL.to_string(),
        };

        let skill_tags: Vec<String> = card
            .select(&s.skills)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect();
        let skills = if skill_tags.is_empty() {
            SENTINEL.to_string()
        } else {
            skill_tags.join(", ")
        };

        Ok(JobRecord {
            title: text_or_sentinel(card, &s.title),
            posted_time,
            location: text_or_sentinel(card, &s.location),
            description: text_or_sentinel(card, &s.description),
            experience_level: text_or_sentinel(card, &s.experience),
            budget: text_or_sentinel(card, &s.budget),
            project_type: text_or_sentinel(card, &s.project_type),
            contract_type: text_or_sentinel(card, &s.contract_type),
            skills,
            activity: text_or_sentinel(card, &s.activity),
            client_info: text_or_sentinel(card, &s.client_info),
            link,
        })
    }
}

/// First match's trimmed text, or the sentinel when nothing matches.
fn text_or_sentinel(card: ElementRef, selector: &Selector) -> String {
    card.select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| SENTINEL.to_string())
}

/// URL-encode a string for use in query parameters.
fn urlencoded(s: &str) -> String {
    utf8_percent_encode(s, ENCODE_URI_COMPONENT_SET).to_string()
}

#[async_trait]
impl JobCollector for Upwork {
    fn name(&self) -> &str {
        "upwork"
    }

    async fn collect(&self, niche: &str, seen: &mut SeenSet) -> Result<Extraction, AppError> {
        let url = self.search_url(niche);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            tracing::warn!("Failed to fetch listings: status {}", resp.status());
            return Ok(Extraction::default());
        }

        let body = resp.text().await?;
        Ok(self.parse(&body, seen))
    }
}
