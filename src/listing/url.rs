use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    CarsCom,
    Autotrader,
    Cargurus,
    Facebook,
    Dealer,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedListing {
    pub source: ListingSource,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

// 17 chars, I/O/Q excluded. Delimited so it does not fire inside longer tokens.
static VIN_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[/=#]([A-HJ-NPR-Z0-9]{17})(?:[/&?#.]|$)").unwrap());

// e.g. /2019-honda-civic or /vehicle/2019_honda_civic-sport
static YEAR_MAKE_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)/((?:19|20)\d{2})[-_]([a-z]+)[-_]([a-z0-9]+)").unwrap());

/// Parse a listing URL into source + whatever vehicle identity the URL
/// itself encodes. Unrecognized hosts without a VIN in the path are
/// rejected rather than guessed at.
pub fn parse(raw: &str) -> Result<ParsedListing, AppError> {
    let trimmed = raw.trim();
    let parsed = Url::parse(trimmed)
        .map_err(|_| AppError::Validation(format!("not a valid listing URL: {trimmed}")))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::Validation(
            "listing URL must use http or https".to_string(),
        ));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::Validation("listing URL has no host".to_string()))?
        .to_lowercase();

    let vin = find_vin(trimmed);
    let (year, make, model) = find_year_make_model(parsed.path());

    let source = if host_matches(&host, "cars.com") {
        ListingSource::CarsCom
    } else if host_matches(&host, "autotrader.com") {
        ListingSource::Autotrader
    } else if host_matches(&host, "cargurus.com") {
        ListingSource::Cargurus
    } else if host_matches(&host, "facebook.com") && parsed.path().starts_with("/marketplace") {
        ListingSource::Facebook
    } else if vin.is_some() {
        // Dealer sites embed the VIN somewhere in the detail URL.
        ListingSource::Dealer
    } else {
        return Err(AppError::Validation(format!(
            "unrecognized listing URL: {host}"
        )));
    };

    Ok(ParsedListing {
        source,
        url: trimmed.to_string(),
        vin,
        year,
        make,
        model,
    })
}

fn host_matches(host: &str, site: &str) -> bool {
    host == site || host.ends_with(&format!(".{site}"))
}

fn find_vin(url: &str) -> Option<String> {
    VIN_SEGMENT
        .captures(url)
        .map(|c| c[1].to_ascii_uppercase())
}

fn find_year_make_model(path: &str) -> (Option<i32>, Option<String>, Option<String>) {
    match YEAR_MAKE_MODEL.captures(path) {
        Some(c) => (
            c[1].parse().ok(),
            Some(title_case(&c[2])),
            Some(title_case(&c[3])),
        ),
        None => (None, None, None),
    }
}

pub(crate) fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cars_com_with_vin() {
        let parsed =
            parse("https://www.cars.com/vehicledetail/detail/2HGFC2F59KH123456/").unwrap();
        assert_eq!(parsed.source, ListingSource::CarsCom);
        assert_eq!(parsed.vin.as_deref(), Some("2HGFC2F59KH123456"));
    }

    #[test]
    fn test_parse_cars_com_year_make_model() {
        let parsed =
            parse("https://www.cars.com/vehicledetail/2019-honda-civic-sport/98765/").unwrap();
        assert_eq!(parsed.source, ListingSource::CarsCom);
        assert_eq!(parsed.year, Some(2019));
        assert_eq!(parsed.make.as_deref(), Some("Honda"));
        assert_eq!(parsed.model.as_deref(), Some("Civic"));
    }

    #[test]
    fn test_parse_autotrader() {
        let parsed = parse(
            "https://www.autotrader.com/cars-for-sale/vehicle/2020_toyota_camry/1GCEK19T24E123456",
        )
        .unwrap();
        assert_eq!(parsed.source, ListingSource::Autotrader);
        assert_eq!(parsed.vin.as_deref(), Some("1GCEK19T24E123456"));
        assert_eq!(parsed.year, Some(2020));
        assert_eq!(parsed.make.as_deref(), Some("Toyota"));
        assert_eq!(parsed.model.as_deref(), Some("Camry"));
    }

    #[test]
    fn test_parse_cargurus_fragment_vin() {
        let parsed =
            parse("https://www.cargurus.com/Cars/inventorylisting/vdp.action#5YJ3E1EA7KF317000")
                .unwrap();
        assert_eq!(parsed.source, ListingSource::Cargurus);
        assert_eq!(parsed.vin.as_deref(), Some("5YJ3E1EA7KF317000"));
    }

    #[test]
    fn test_parse_facebook_marketplace() {
        let parsed = parse("https://www.facebook.com/marketplace/item/1234567890/").unwrap();
        assert_eq!(parsed.source, ListingSource::Facebook);
        assert!(parsed.vin.is_none());
    }

    #[test]
    fn test_parse_dealer_with_vin() {
        let parsed =
            parse("https://www.sometown-motors.example/inventory/used/JM1BL1SF5A1234567.html")
                .unwrap();
        assert_eq!(parsed.source, ListingSource::Dealer);
        assert_eq!(parsed.vin.as_deref(), Some("JM1BL1SF5A1234567"));
    }

    #[test]
    fn test_parse_dealer_query_vin() {
        let parsed = parse("https://dealer.example/detail?vin=JM1BL1SF5A1234567&color=red").unwrap();
        assert_eq!(parsed.source, ListingSource::Dealer);
        assert_eq!(parsed.vin.as_deref(), Some("JM1BL1SF5A1234567"));
    }

    #[test]
    fn test_parse_unrecognized_host_rejected() {
        let err = parse("https://example.com/some/page").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_parse_garbage_rejected() {
        assert!(matches!(
            parse("not a url at all"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_parse_non_http_scheme_rejected() {
        assert!(matches!(
            parse("ftp://cars.com/2019-honda-civic"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_vin_excludes_i_o_q() {
        // Contains 'I', not a valid VIN alphabet; must not match.
        assert!(find_vin("/detail/2HGFC2F59KHI23456X").is_none());
    }

    #[test]
    fn test_vin_lowercased_input_uppercased() {
        let vin = find_vin("/detail/2hgfc2f59kh123456/").unwrap();
        assert_eq!(vin, "2HGFC2F59KH123456");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("honda"), "Honda");
        assert_eq!(title_case("CIVIC"), "Civic");
        assert_eq!(title_case(""), "");
    }
}
