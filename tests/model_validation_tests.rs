use listings_marketplace::{
    models::{
        DEFAULT_IMAGE_URL, Image, Listing, ListingEnvelope, ListingFormFields, ListingInput,
        NumberField, RawListing, ReviewFormFields, StoredImage, UserProfile, User,
    },
    validation::{validate_listing, validate_review},
};
use serde_json::json;
use uuid::Uuid;

fn envelope(value: serde_json::Value) -> Option<RawListing> {
    serde_json::from_value::<ListingEnvelope>(value)
        .expect("envelope should deserialize")
        .listing
}

// --- Listing Validation ---

#[test]
fn test_valid_listing_is_accepted() {
    let input = validate_listing(envelope(json!({
        "listing": {
            "title": "  Cabin ",
            "price": 100,
            "location": "X",
            "country": "Y",
            "image": "http://i/a.jpg"
        }
    })))
    .unwrap();

    assert_eq!(
        input,
        ListingInput {
            title: "Cabin".into(),
            description: None,
            image: Some("http://i/a.jpg".into()),
            price: 100.0,
            location: "X".into(),
            country: "Y".into(),
        }
    );
}

#[test]
fn test_missing_envelope_is_rejected() {
    assert_eq!(
        validate_listing(envelope(json!({}))).unwrap_err(),
        "\"listing\" is required"
    );
}

#[test]
fn test_every_violation_is_reported() {
    let err = validate_listing(envelope(json!({
        "listing": { "title": "", "price": -1, "country": "Y" }
    })))
    .unwrap_err();

    assert_eq!(
        err,
        "\"listing.title\" is not allowed to be empty, \
         \"listing.price\" must be greater than or equal to 0, \
         \"listing.location\" is required"
    );
}

#[test]
fn test_price_accepts_numeric_strings_only() {
    let mut raw = RawListing {
        title: Some("T".into()),
        location: Some("L".into()),
        country: Some("C".into()),
        price: Some(NumberField::Text("42.5".into())),
        ..Default::default()
    };
    assert_eq!(validate_listing(Some(raw.clone())).unwrap().price, 42.5);

    raw.price = Some(NumberField::Text("cheap".into()));
    assert_eq!(
        validate_listing(Some(raw.clone())).unwrap_err(),
        "\"listing.price\" must be a number"
    );

    raw.price = Some(NumberField::Number(0.0));
    assert_eq!(validate_listing(Some(raw)).unwrap().price, 0.0);
}

#[test]
fn test_blank_image_counts_as_absent() {
    let raw = RawListing {
        title: Some("T".into()),
        price: Some(NumberField::Number(1.0)),
        location: Some("L".into()),
        country: Some("C".into()),
        image: Some("   ".into()),
        ..Default::default()
    };
    assert_eq!(validate_listing(Some(raw)).unwrap().image, None);
}

#[test]
fn test_unknown_listing_keys_fail_to_deserialize() {
    let result = serde_json::from_value::<ListingEnvelope>(json!({
        "listing": { "title": "T", "owner": "someone-else" }
    }));
    assert!(result.is_err());

    let result = serde_json::from_value::<ListingEnvelope>(json!({ "title": "T" }));
    assert!(result.is_err());
}

#[test]
fn test_empty_form_means_no_listing() {
    assert!(ListingFormFields::default().into_raw().is_none());

    let form = ListingFormFields {
        price: Some("10".into()),
        ..Default::default()
    };
    let raw = form.into_raw().unwrap();
    assert_eq!(raw.price, Some(NumberField::Text("10".into())));
}

// --- Review Validation ---

#[test]
fn test_review_rating_bounds() {
    let review = |rating: &str| ReviewFormFields {
        rating: Some(rating.into()),
        comment: Some("ok".into()),
    };

    assert_eq!(validate_review(review("1")).unwrap().rating, 1);
    assert_eq!(validate_review(review("5")).unwrap().rating, 5);
    assert!(validate_review(review("0")).is_err());
    assert!(validate_review(review("6")).is_err());
    assert_eq!(
        validate_review(review("2.5")).unwrap_err(),
        "\"review.rating\" must be an integer"
    );
}

#[test]
fn test_review_comment_required() {
    let err = validate_review(ReviewFormFields {
        rating: Some("3".into()),
        comment: None,
    })
    .unwrap_err();
    assert_eq!(err, "\"review.comment\" is required");
}

// --- Image Normalization ---

#[test]
fn test_stored_image_accepts_both_shapes() {
    let legacy: StoredImage = serde_json::from_value(json!("http://legacy/a.jpg")).unwrap();
    assert_eq!(legacy, StoredImage::Legacy("http://legacy/a.jpg".into()));
    assert_eq!(
        Image::from(legacy),
        Image {
            filename: String::new(),
            url: "http://legacy/a.jpg".into(),
        }
    );

    let structured: StoredImage =
        serde_json::from_value(json!({ "filename": "listingimage", "url": "http://x" })).unwrap();
    assert_eq!(
        Image::from(structured),
        Image {
            filename: "listingimage".into(),
            url: "http://x".into(),
        }
    );
}

#[test]
fn test_structured_image_is_what_gets_written() {
    let written = serde_json::to_value(StoredImage::from(Image::from_url("http://y"))).unwrap();
    assert_eq!(written, json!({ "filename": "", "url": "http://y" }));
}

#[test]
fn test_new_listing_image_defaults() {
    let input = ListingInput {
        title: "T".into(),
        price: 5.0,
        location: "L".into(),
        country: "C".into(),
        ..Default::default()
    };
    let owner = Uuid::new_v4();

    let listing = Listing::new(input.clone(), owner);
    assert_eq!(listing.owner, owner);
    assert_eq!(listing.image.url, DEFAULT_IMAGE_URL);
    assert!(listing.reviews.is_empty());

    let listing = Listing::new(
        ListingInput {
            image: Some("http://i/z.jpg".into()),
            ..input
        },
        owner,
    );
    assert_eq!(listing.image, Image::from_url("http://i/z.jpg"));
}

#[test]
fn test_apply_keeps_absent_optional_fields() {
    let mut listing = Listing::new(
        ListingInput {
            title: "T".into(),
            description: Some("Sea view".into()),
            image: Some("http://i/keep.jpg".into()),
            ..Default::default()
        },
        Uuid::new_v4(),
    );
    let owner = listing.owner;

    listing.apply(ListingInput {
        title: "New".into(),
        price: 9.0,
        ..Default::default()
    });
    assert_eq!(listing.title, "New");
    assert_eq!(listing.owner, owner);
    assert_eq!(listing.image.url, "http://i/keep.jpg");
    assert_eq!(listing.description, "Sea view");

    // An explicit empty description still clears it.
    listing.apply(ListingInput {
        title: "New".into(),
        description: Some(String::new()),
        ..Default::default()
    });
    assert_eq!(listing.description, "");
}

// --- Serialization ---

#[test]
fn test_user_password_material_is_never_serialized() {
    let user = User {
        id: Uuid::new_v4(),
        username: "alice".into(),
        email: "a@example.com".into(),
        password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
    };

    let value = serde_json::to_value(&user).unwrap();
    assert!(value.get("password_hash").is_none());
    assert_eq!(UserProfile::from(&user).username, "alice");
}
