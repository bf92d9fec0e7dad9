#![allow(dead_code)]

use axum::{ServiceExt, extract::Request};
use chrono::Utc;
use listings_marketplace::{
    AppConfig, AppState, create_app,
    models::{Image, ListingRecord, StoredImage},
    repository::{MemoryRepository, Repository, RepositoryState},
};
use reqwest::{Client, Response, header::LOCATION, redirect::Policy};
use sqlx::types::Json;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

pub const PASSWORD: &str = "correct-horse-battery";

#[derive(Clone)]
pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepository>,
}

/// Spawns the full app (method override, sessions, routes) on an ephemeral port,
/// backed by a fresh in-memory repository the test can inspect.
pub async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new());
    let state = AppState {
        repo: repo.clone() as RepositoryState,
        config: AppConfig::default(),
    };
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
            .await
            .unwrap();
    });

    TestApp { address, repo }
}

/// A browser-like client: keeps the session cookie, never follows redirects.
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .expect("response has no Location header")
        .to_str()
        .unwrap()
        .to_string()
}

pub fn listing_form<'a>(title: &'a str, image: &'a str) -> Vec<(&'static str, &'a str)> {
    vec![
        ("listing[title]", title),
        ("listing[description]", "A quiet place"),
        ("listing[image]", image),
        ("listing[price]", "100"),
        ("listing[location]", "X"),
        ("listing[country]", "Y"),
    ]
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers `username` through the signup form and returns its id. The client is
    /// left logged in.
    pub async fn signup(&self, client: &Client, username: &str) -> Uuid {
        let email = format!("{username}@example.com");
        let response = client
            .post(self.url("/signup"))
            .form(&[
                ("username", username),
                ("email", email.as_str()),
                ("password", PASSWORD),
            ])
            .send()
            .await
            .expect("signup request failed");
        assert_eq!(response.status(), 303);
        assert_eq!(location(&response), "/listings");

        self.repo
            .find_user_by_username(username)
            .await
            .unwrap()
            .expect("user was not stored")
            .id
    }

    /// Creates a listing through the form and returns its id.
    pub async fn create_listing(&self, client: &Client, title: &str) -> Uuid {
        self.create_listing_with(client, title, "http://i/a.jpg").await
    }

    pub async fn create_listing_with(&self, client: &Client, title: &str, image: &str) -> Uuid {
        let response = client
            .post(self.url("/listings"))
            .form(&listing_form(title, image))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 303);

        self.repo
            .find_listings()
            .await
            .unwrap()
            .into_iter()
            .find(|l| l.title == title)
            .expect("listing was not stored")
            .id
    }

    /// Stores a listing whose image is still the bare-string legacy form.
    pub fn seed_legacy_listing(&self, owner: Uuid, url: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.repo
            .insert_record(ListingRecord {
                id,
                title: "Old Cottage".into(),
                description: "Imported".into(),
                image: Json(StoredImage::Legacy(url.into())),
                price: 80.0,
                location: "X".into(),
                country: "Y".into(),
                owner,
                reviews: vec![],
                created_at: Utc::now(),
            })
            .unwrap();
        id
    }

    pub async fn get_text(&self, client: &Client, path: &str) -> String {
        client
            .get(self.url(path))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    }

    pub fn stored_image(&self, id: Uuid) -> StoredImage {
        self.repo.record(id).unwrap().unwrap().image.0
    }

    pub fn structured(url: &str) -> StoredImage {
        StoredImage::Structured(Image::from_url(url))
    }
}
