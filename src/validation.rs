use axum::{
    Form, Json,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
};

use crate::{
    error::AppError,
    models::{
        ListingEnvelope, ListingFormFields, ListingInput, NumberField, RawListing,
        ReviewFormFields, ReviewInput,
    },
};

const MIN_RATING: i32 = 1;
const MAX_RATING: i32 = 5;

/// Collects field-level violations so a payload reports all of them at once.
#[derive(Default)]
struct Violations(Vec<String>);

impl Violations {
    fn push(&mut self, path: &str, message: &str) {
        self.0.push(format!("\"{path}\" {message}"));
    }

    /// A required, non-blank string.
    fn required_text(&mut self, path: &str, value: Option<String>) -> String {
        match value {
            None => {
                self.push(path, "is required");
                String::new()
            }
            Some(text) if text.trim().is_empty() => {
                self.push(path, "is not allowed to be empty");
                String::new()
            }
            Some(text) => text.trim().to_string(),
        }
    }

    fn required_number(&mut self, path: &str, value: Option<NumberField>) -> Option<f64> {
        let number = match value {
            None => {
                self.push(path, "is required");
                return None;
            }
            Some(NumberField::Number(n)) => Some(n),
            Some(NumberField::Text(text)) if text.trim().is_empty() => {
                self.push(path, "is required");
                return None;
            }
            Some(NumberField::Text(text)) => text.trim().parse::<f64>().ok(),
        };

        match number {
            Some(n) if n.is_finite() => Some(n),
            _ => {
                self.push(path, "must be a number");
                None
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, String> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(self.0.join(", "))
        }
    }
}

/// validate_listing
///
/// Checks a candidate listing against the fixed shape and produces the typed input the
/// rest of the crate works with. On failure the error string joins every violation.
pub fn validate_listing(raw: Option<RawListing>) -> Result<ListingInput, String> {
    let Some(raw) = raw else {
        return Err("\"listing\" is required".to_string());
    };

    let mut violations = Violations::default();

    let title = violations.required_text("listing.title", raw.title);
    let description = raw.description.map(|d| d.trim().to_string());

    let price = match violations.required_number("listing.price", raw.price) {
        Some(p) if p < 0.0 => {
            violations.push("listing.price", "must be greater than or equal to 0");
            0.0
        }
        Some(p) => p,
        None => 0.0,
    };

    let location = violations.required_text("listing.location", raw.location);
    let country = violations.required_text("listing.country", raw.country);

    let image = raw
        .image
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());

    violations.finish(ListingInput {
        title,
        description,
        image,
        price,
        location,
        country,
    })
}

/// validate_review
pub fn validate_review(fields: ReviewFormFields) -> Result<ReviewInput, String> {
    let mut violations = Violations::default();

    let rating = match violations
        .required_number("review.rating", fields.rating.map(NumberField::Text))
    {
        Some(r) if r.fract() != 0.0 => {
            violations.push("review.rating", "must be an integer");
            0
        }
        Some(r) if r < MIN_RATING as f64 => {
            violations.push("review.rating", "must be greater than or equal to 1");
            0
        }
        Some(r) if r > MAX_RATING as f64 => {
            violations.push("review.rating", "must be less than or equal to 5");
            0
        }
        Some(r) => r as i32,
        None => 0,
    };

    let comment = violations.required_text("review.comment", fields.comment);

    violations.finish(ReviewInput { rating, comment })
}

fn is_json(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}

/// ValidListing Extractor
///
/// Reads a listing payload from either a JSON envelope or an HTML form body and runs it
/// through [`validate_listing`]. Rejects with `AppError::Validation` (400) before the
/// handler can touch the store.
#[derive(Debug)]
pub struct ValidListing(pub ListingInput);

impl<S> FromRequest<S> for ValidListing
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let raw = if is_json(&req) {
            let Json(envelope) = Json::<ListingEnvelope>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
            envelope.listing
        } else {
            let Form(fields) = Form::<ListingFormFields>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
            fields.into_raw()
        };

        validate_listing(raw)
            .map(ValidListing)
            .map_err(AppError::Validation)
    }
}

/// ValidReview Extractor
#[derive(Debug)]
pub struct ValidReview(pub ReviewInput);

impl<S> FromRequest<S> for ValidReview
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(fields) = Form::<ReviewFormFields>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        validate_review(fields)
            .map(ValidReview)
            .map_err(AppError::Validation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cabin() -> RawListing {
        RawListing {
            title: Some("Cabin".into()),
            description: None,
            image: Some("http://i/a.jpg".into()),
            price: Some(NumberField::Number(100.0)),
            location: Some("X".into()),
            country: Some("Y".into()),
        }
    }

    #[test]
    fn accepts_a_complete_listing() {
        let input = validate_listing(Some(cabin())).unwrap();
        assert_eq!(input.title, "Cabin");
        assert_eq!(input.description, None);
        assert_eq!(input.price, 100.0);
        assert_eq!(input.image.as_deref(), Some("http://i/a.jpg"));
    }

    #[test]
    fn missing_envelope_is_rejected() {
        assert_eq!(validate_listing(None).unwrap_err(), "\"listing\" is required");
    }

    #[test]
    fn reports_every_violation() {
        let raw = RawListing {
            title: Some("   ".into()),
            price: Some(NumberField::Text("cheap".into())),
            country: Some("Y".into()),
            ..Default::default()
        };

        let err = validate_listing(Some(raw)).unwrap_err();
        assert_eq!(
            err,
            "\"listing.title\" is not allowed to be empty, \
             \"listing.price\" must be a number, \
             \"listing.location\" is required"
        );
    }

    #[test]
    fn negative_price_is_rejected() {
        let raw = RawListing {
            price: Some(NumberField::Text("-5".into())),
            ..cabin()
        };
        let err = validate_listing(Some(raw)).unwrap_err();
        assert_eq!(err, "\"listing.price\" must be greater than or equal to 0");
    }

    #[test]
    fn blank_image_means_no_image() {
        let raw = RawListing {
            image: Some("".into()),
            ..cabin()
        };
        assert_eq!(validate_listing(Some(raw)).unwrap().image, None);
    }

    #[test]
    fn unknown_json_fields_fail_to_deserialize() {
        let result = serde_json::from_str::<ListingEnvelope>(
            r#"{"listing": {"title": "Cabin", "owner": "someone-else"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn review_rating_must_be_in_range() {
        let fields = ReviewFormFields {
            rating: Some("6".into()),
            comment: Some("Lovely".into()),
        };
        assert_eq!(
            validate_review(fields).unwrap_err(),
            "\"review.rating\" must be less than or equal to 5"
        );

        let fields = ReviewFormFields {
            rating: Some("4".into()),
            comment: Some("Lovely".into()),
        };
        assert_eq!(
            validate_review(fields).unwrap(),
            ReviewInput {
                rating: 4,
                comment: "Lovely".into()
            }
        );
    }
}
