use std::sync::LazyLock;

use regex::Regex;

static PRICE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$(\d{1,3},?\d{3})").unwrap());

static MILEAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,3},?\d{3})\s*(?:mi(?:les)?\b|mileage|odometer)").unwrap()
});

static VIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)VIN[:\s]*([A-HJ-NPR-Z0-9]{17})").unwrap());

static YEAR_MAKE_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"((?:19|20)\d{2})\s+([A-Z][a-zA-Z]+)\s+([A-Z][a-zA-Z0-9\-]+)").unwrap());

static TRIM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:trim|package)[:\s]+([A-Za-z0-9 \-]+)").unwrap());

#[derive(Debug, Default, Clone)]
pub struct ExtractedFields {
    pub price: Option<u32>,
    pub mileage: Option<u32>,
    pub vin: Option<String>,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
}

/// Best-effort field extraction from raw scraped listing text. Anything
/// that does not match stays None; callers only use these to fill gaps.
pub fn extract_vehicle_fields(text: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::default();

    if let Some(c) = PRICE.captures(text) {
        fields.price = c[1].replace(',', "").parse().ok();
    }

    if let Some(c) = MILEAGE.captures(text) {
        fields.mileage = c[1].replace(',', "").parse().ok();
    }

    if let Some(c) = VIN.captures(text) {
        fields.vin = Some(c[1].to_ascii_uppercase());
    }

    if let Some(c) = YEAR_MAKE_MODEL.captures(text) {
        fields.year = c[1].parse().ok();
        fields.make = Some(c[2].to_string());
        fields.model = Some(c[3].to_string());
    }

    if let Some(c) = TRIM.captures(text) {
        let trim = c[1].trim();
        if !trim.is_empty() {
            fields.trim = Some(trim.to_string());
        }
    }

    fields
}
