use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::listing::extract::{self, ExtractedFields};
use crate::listing::url::{self as listing_url, ListingSource, ParsedListing};
use crate::upstream::Upstreams;
use crate::upstream::autodev::ListingRecord;

const MAX_PHOTOS: usize = 5;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingInput {
    pub url: Option<String>,
    pub vin: Option<String>,
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub price: Option<u32>,
    pub mileage: Option<u32>,
    pub zip: Option<String>,
    pub color: Option<String>,
    pub dealer_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleProfile {
    pub year: i32,
    pub make: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dealer_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drivetrain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpg_city: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpg_highway: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ListingSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug)]
pub struct ResolvedListing {
    pub profile: VehicleProfile,
    pub listing_text: String,
}

/// Working state while identity is assembled from URL, scrape, manual
/// fields and VIN decode. Precedence: manual input wins over everything;
/// fetched data only fills gaps.
#[derive(Debug, Default, Clone)]
pub(crate) struct Draft {
    pub year: Option<i32>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub vin: Option<String>,
    pub price: Option<u32>,
    pub mileage: Option<u32>,
    pub zip: Option<String>,
    pub color: Option<String>,
    pub dealer_name: Option<String>,
    pub dealer_phone: Option<String>,
    pub engine: Option<String>,
    pub transmission: Option<String>,
    pub drivetrain: Option<String>,
    pub fuel_type: Option<String>,
    pub body_type: Option<String>,
    pub mpg_city: Option<u32>,
    pub mpg_highway: Option<u32>,
    pub photos: Vec<String>,
    pub source: Option<ListingSource>,
    pub url: Option<String>,
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() && value.is_some() {
        *slot = value;
    }
}

impl Draft {
    pub(crate) fn apply_parsed(&mut self, parsed: ParsedListing) {
        self.source = Some(parsed.source);
        self.url = Some(parsed.url);
        fill(&mut self.vin, parsed.vin);
        fill(&mut self.year, parsed.year);
        fill(&mut self.make, parsed.make);
        fill(&mut self.model, parsed.model);
    }

    pub(crate) fn apply_extracted(&mut self, extracted: ExtractedFields) {
        fill(&mut self.price, extracted.price);
        fill(&mut self.mileage, extracted.mileage);
        fill(&mut self.vin, extracted.vin);
        fill(&mut self.year, extracted.year);
        fill(&mut self.make, extracted.make);
        fill(&mut self.model, extracted.model);
        fill(&mut self.trim, extracted.trim);
    }

    pub(crate) fn apply_manual(&mut self, input: &ListingInput) {
        // Caller-provided fields override anything fetched.
        for (slot, value) in [
            (&mut self.make, &input.make),
            (&mut self.model, &input.model),
            (&mut self.trim, &input.trim),
            (&mut self.vin, &input.vin),
            (&mut self.zip, &input.zip),
            (&mut self.color, &input.color),
            (&mut self.dealer_name, &input.dealer_name),
        ] {
            if value.is_some() {
                *slot = value.clone();
            }
        }
        if input.year.is_some() {
            self.year = input.year;
        }
        if input.price.is_some() {
            self.price = input.price;
        }
        if input.mileage.is_some() {
            self.mileage = input.mileage;
        }
    }

    pub(crate) fn apply_vin_record(&mut self, record: ListingRecord) {
        fill(&mut self.year, record.year);
        fill(&mut self.make, record.make);
        fill(&mut self.model, record.model);
        fill(&mut self.trim, record.trim);
        fill(&mut self.price, record.price);
        fill(&mut self.mileage, record.mileage);
        fill(&mut self.dealer_name, record.dealer_name);
        fill(&mut self.dealer_phone, record.dealer_phone);
        fill(&mut self.color, record.display_color);
        fill(&mut self.engine, record.engine);
        fill(&mut self.transmission, record.transmission);
        fill(&mut self.drivetrain, record.drivetrain);
        fill(&mut self.fuel_type, record.fuel_type);
        fill(&mut self.body_type, record.body_type);
        fill(&mut self.mpg_city, record.mpg_city);
        fill(&mut self.mpg_highway, record.mpg_highway);
        if self.photos.is_empty() {
            self.photos = record.photo_urls.into_iter().take(MAX_PHOTOS).collect();
        }
    }

    pub(crate) fn into_profile(self) -> Result<VehicleProfile, AppError> {
        let (Some(year), Some(make), Some(model)) = (self.year, self.make, self.model) else {
            return Err(AppError::Validation(
                "could not identify the vehicle; provide year, make and model, \
                 or paste a different listing URL"
                    .to_string(),
            ));
        };

        Ok(VehicleProfile {
            year,
            make,
            model,
            trim: self.trim,
            vin: self.vin,
            price: self.price,
            mileage: self.mileage,
            zip: self.zip,
            color: self.color,
            dealer_name: self.dealer_name,
            dealer_phone: self.dealer_phone,
            engine: self.engine,
            transmission: self.transmission,
            drivetrain: self.drivetrain,
            fuel_type: self.fuel_type,
            body_type: self.body_type,
            mpg_city: self.mpg_city,
            mpg_highway: self.mpg_highway,
            photos: self.photos,
            source: self.source,
            url: self.url,
        })
    }
}

#[tracing::instrument(
    name = "pipeline_stage resolve",
    skip(upstreams, input),
    fields(
        pipeline.stage = "resolve",
        vehicle.year,
        vehicle.make,
        vehicle.model,
    )
)]
pub async fn resolve(
    upstreams: &Upstreams,
    input: &ListingInput,
) -> Result<ResolvedListing, AppError> {
    let mut draft = Draft::default();
    let mut listing_text = String::new();

    if let Some(raw_url) = &input.url {
        draft.apply_parsed(listing_url::parse(raw_url)?);

        let page = upstreams.scraper.scrape(raw_url).await?;
        if !page.image_links.is_empty() {
            draft.photos = page.image_links.into_iter().take(MAX_PHOTOS).collect();
        }
        if !page.text.is_empty() {
            draft.apply_extracted(extract::extract_vehicle_fields(&page.text));
            listing_text = page.text;
        }
    }

    draft.apply_manual(input);

    if let Some(vin) = draft.vin.clone()
        && upstreams.autodev.has_key()
        && let Some(record) = upstreams.autodev.decode_vin(&vin).await?
    {
        draft.apply_vin_record(record);
    }

    let profile = draft.into_profile()?;

    let span = tracing::Span::current();
    span.record("vehicle.year", profile.year);
    span.record("vehicle.make", profile.make.as_str());
    span.record("vehicle.model", profile.model.as_str());

    Ok(ResolvedListing {
        profile,
        listing_text,
    })
}
