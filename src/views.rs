//! Server-side HTML pages.
//!
//! Every page goes through [`layout`], which renders the navbar for the current user and
//! the `successMsg` / `errorMsg` flash alerts drained for this render.

use axum::{http::StatusCode, response::Html};
use uuid::Uuid;

use crate::{
    models::{Listing, ListingDetails},
    session::Page,
};

const STYLE: &str = r#"
body{font-family:system-ui,sans-serif;margin:0;background:#fafafa;color:#222}
nav{display:flex;gap:1rem;align-items:center;padding:1rem 2rem;background:#fff;border-bottom:1px solid #ddd}
nav .spacer{flex:1}
a{color:#fe424d;text-decoration:none}
main{max-width:960px;margin:2rem auto;padding:0 1rem}
.alert{padding:.75rem 1rem;border-radius:6px;margin-bottom:1rem}
.alert-success{background:#e6f6ea;border:1px solid #9bd3a7}
.alert-error{background:#fdecea;border:1px solid #f1a9a0}
.flash-message{margin:.25rem 0}
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(260px,1fr));gap:1.5rem}
.card img{width:100%;height:180px;object-fit:cover;border-radius:12px}
form label{display:block;margin-top:.75rem}
form input,form textarea{width:100%;padding:.5rem;box-sizing:border-box}
.review{border:1px solid #ddd;border-radius:8px;padding:.75rem;margin:.5rem 0}
"#;

/// Escapes text for safe inclusion in HTML bodies and attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whole prices print without decimals.
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{price:.0}")
    } else {
        format!("{price:.2}")
    }
}

fn nav(page: &Page) -> String {
    let account = match &page.user {
        Some(user) => format!(
            r#"<span>Signed in as <strong>{}</strong></span><a href="/logout">Log out</a>"#,
            escape(&user.username)
        ),
        None => r#"<a href="/signup">Sign up</a><a href="/login">Log in</a>"#.to_string(),
    };

    format!(
        r#"<nav><a href="/listings"><strong>Listings</strong></a><a href="/listings/new">Add a listing</a><span class="spacer"></span>{account}</nav>"#
    )
}

/// One alert block per kind, so `successMsg` and `errorMsg` stay unique ids.
fn alert_block(id: &str, class: &str, messages: &[String]) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let items: String = messages
        .iter()
        .map(|msg| format!(r#"<p class="flash-message">{}</p>"#, escape(msg)))
        .collect();
    format!(r#"<div class="alert {class}" id="{id}">{items}</div>"#)
}

fn alerts(page: &Page) -> String {
    alert_block("successMsg", "alert-success", &page.flash.success)
        + &alert_block("errorMsg", "alert-error", &page.flash.error)
}

fn layout(title: &str, page: &Page, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title><style>{STYLE}</style></head>
<body>
{nav}
<main>
{alerts}
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        nav = nav(page),
        alerts = alerts(page),
    ))
}

pub fn index(page: &Page, listings: &[Listing]) -> Html<String> {
    let cards: String = listings
        .iter()
        .map(|l| {
            format!(
                r#"<a class="card" href="/listings/{id}"><img src="{url}" alt="listing image"><p><b>{title}</b><br>&#8377; {price} / night</p></a>"#,
                id = l.id,
                url = escape(&l.image.url),
                title = escape(&l.title),
                price = format_price(l.price),
            )
        })
        .collect();

    layout(
        "All Listings",
        page,
        &format!(r#"<h2>All Listings</h2><div class="grid">{cards}</div>"#),
    )
}

fn listing_fields(listing: Option<&Listing>) -> String {
    let value = |f: fn(&Listing) -> String| listing.map(f).map(|v| escape(&v)).unwrap_or_default();

    format!(
        r#"<label>Title<input name="listing[title]" value="{title}" required></label>
<label>Description<textarea name="listing[description]">{description}</textarea></label>
<label>Image URL<input name="listing[image]" value="{image}"></label>
<label>Price<input name="listing[price]" type="number" min="0" step="any" value="{price}" required></label>
<label>Country<input name="listing[country]" value="{country}" required></label>
<label>Location<input name="listing[location]" value="{location}" required></label>"#,
        title = value(|l| l.title.clone()),
        description = value(|l| l.description.clone()),
        image = value(|l| l.image.url.clone()),
        price = value(|l| format_price(l.price)),
        country = value(|l| l.country.clone()),
        location = value(|l| l.location.clone()),
    )
}

pub fn new_form(page: &Page) -> Html<String> {
    layout(
        "New Listing",
        page,
        &format!(
            r#"<h2>Create a New Listing</h2>
<form method="POST" action="/listings">{fields}<button>Add</button></form>"#,
            fields = listing_fields(None)
        ),
    )
}

pub fn edit_form(page: &Page, listing: &Listing) -> Html<String> {
    layout(
        "Edit Listing",
        page,
        &format!(
            r#"<h2>Edit your Listing</h2>
<img src="{url}" alt="current image" style="max-width:240px">
<form method="POST" action="/listings/{id}?_method=PUT">{fields}<button>Edit</button></form>"#,
            url = escape(&listing.image.url),
            id = listing.id,
            fields = listing_fields(Some(listing)),
        ),
    )
}

/// The detail page. Owner controls only show for the owner, review controls only for
/// their authors, and the review form only for logged-in users.
pub fn show(page: &Page, details: &ListingDetails) -> Html<String> {
    let listing = &details.listing;
    let viewer: Option<Uuid> = page.user.as_ref().map(|u| u.id);

    let owner = details
        .owner
        .as_ref()
        .map(|o| escape(&o.username))
        .unwrap_or_else(|| "unknown".to_string());

    let owner_controls = if viewer == Some(listing.owner) {
        format!(
            r#"<a href="/listings/{id}/edit">Edit</a>
<form method="POST" action="/listings/{id}?_method=DELETE"><button>Delete</button></form>"#,
            id = listing.id
        )
    } else {
        String::new()
    };

    let review_form = if viewer.is_some() {
        format!(
            r#"<h4>Leave a Review</h4>
<form method="POST" action="/listings/{id}/reviews">
<label>Rating<input name="review[rating]" type="range" min="1" max="5" value="3"></label>
<label>Comment<textarea name="review[comment]" required></textarea></label>
<button>Submit</button></form>"#,
            id = listing.id
        )
    } else {
        String::new()
    };

    let reviews: String = details
        .reviews
        .iter()
        .map(|r| {
            let delete = if viewer == Some(r.author) {
                format!(
                    r#"<form method="POST" action="/listings/{lid}/reviews/{rid}?_method=DELETE"><button>Delete</button></form>"#,
                    lid = listing.id,
                    rid = r.id
                )
            } else {
                String::new()
            };
            format!(
                r#"<div class="review"><b>@{author}</b> <span>{stars}</span><p>{comment}</p>{delete}</div>"#,
                author = escape(r.author_username.as_deref().unwrap_or("unknown")),
                stars = "&#9733;".repeat(r.rating.clamp(0, 5) as usize),
                comment = escape(&r.comment),
            )
        })
        .collect();

    layout(
        &listing.title,
        page,
        &format!(
            r#"<h2>{title}</h2>
<img src="{url}" alt="listing image" style="max-width:100%">
<p><i>Owned by {owner}</i></p>
<p>{description}</p>
<p>&#8377; {price} / night</p>
<p>{location}, {country}</p>
{owner_controls}
<hr>
{review_form}
<h4>All Reviews</h4>
{reviews}"#,
            title = escape(&listing.title),
            url = escape(&listing.image.url),
            description = escape(&listing.description),
            price = format_price(listing.price),
            location = escape(&listing.location),
            country = escape(&listing.country),
        ),
    )
}

pub fn signup_form(page: &Page) -> Html<String> {
    layout(
        "Sign up",
        page,
        r#"<h2>Sign up</h2>
<form method="POST" action="/signup">
<label>Username<input name="username" required></label>
<label>Email<input name="email" type="email" required></label>
<label>Password<input name="password" type="password" required></label>
<button>Sign up</button></form>"#,
    )
}

pub fn login_form(page: &Page) -> Html<String> {
    layout(
        "Log in",
        page,
        r#"<h2>Log in</h2>
<form method="POST" action="/login">
<label>Username<input name="username" required></label>
<label>Password<input name="password" type="password" required></label>
<button>Log in</button></form>"#,
    )
}

/// Rendered by the centralized error responder. It has no session to work with, so the
/// navbar is the anonymous one.
pub fn error_page(status: StatusCode, message: &str) -> Html<String> {
    layout(
        "Error",
        &Page::default(),
        &format!(
            r#"<div class="alert alert-error"><h3>{code}</h3><p>{message}</p></div><a href="/listings">Back to listings</a>"#,
            code = status.as_u16(),
            message = escape(message),
        ),
    )
}
