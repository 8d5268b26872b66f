//! Custom element census

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::info;

use notegrade_common::{Report, RubricItem};

use crate::driver::BrowserDriver;
use crate::error::HarnessResult;
use crate::scripts;

/// Distinct custom element tags needed to pass
pub const MIN_CUSTOM_ELEMENTS: usize = 3;

/// Attributes that do not count as custom
pub const STANDARD_ATTRIBUTES: &[&str] = &[
    "id",
    "class",
    "style",
    "type",
    "name",
    "value",
    "placeholder",
    "required",
    "minlength",
    "maxlength",
];

/// One element reported by the census script
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScannedElement {
    pub tag: String,
    #[serde(default)]
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentCensus {
    pub tags: BTreeSet<String>,
    /// First non-standard attribute seen, with its element
    pub custom_attribute: Option<(String, String)>,
}

impl ComponentCensus {
    pub fn from_elements(elements: &[ScannedElement]) -> Self {
        let mut census = Self::default();
        for element in elements {
            let tag = element.tag.to_ascii_lowercase();
            if !tag.contains('-') {
                continue;
            }
            if census.custom_attribute.is_none() {
                census.custom_attribute = element
                    .attributes
                    .iter()
                    .map(|a| a.to_ascii_lowercase())
                    .find(|a| !STANDARD_ATTRIBUTES.contains(&a.as_str()))
                    .map(|a| (tag.clone(), a));
            }
            census.tags.insert(tag);
        }
        census
    }

    pub fn meets_minimum(&self) -> bool {
        self.tags.len() >= MIN_CUSTOM_ELEMENTS
    }
}

pub async fn check_components(driver: &dyn BrowserDriver, report: &mut Report) -> HarnessResult<()> {
    let raw = driver.evaluate(scripts::CUSTOM_ELEMENT_CENSUS, Value::Null).await?;
    let elements: Vec<ScannedElement> = serde_json::from_value(raw)?;
    let census = ComponentCensus::from_elements(&elements);

    info!("Custom elements found: {:?}", census.tags);
    report.record_bool(RubricItem::WebComponents, census.meets_minimum());

    match &census.custom_attribute {
        Some((tag, attr)) => info!("Custom attribute `{}` on <{}>", attr, tag),
        None => info!("No custom attributes on custom elements"),
    }
    report.record_bool(RubricItem::CustomAttributes, census.custom_attribute.is_some());
    Ok(())
}
