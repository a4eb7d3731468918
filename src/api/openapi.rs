use super::handlers::{auth, health, locations, onboarding, reports};
use utoipa::openapi::{
    security::{Http, HttpAuthScheme, SecurityScheme},
    Contact, InfoBuilder, License, OpenApiBuilder, Tag,
};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut openapi = cargo_openapi();
    openapi.tags = Some(vec![
        tag("health", "Liveness and Data Service reachability"),
        tag("auth", "Phone/password accounts and bearer tokens"),
        tag("onboarding", "Device-first setup and profiles"),
        tag("locations", "GPS pings"),
        tag("reports", "Emergency and auto-detected accident reports"),
    ]);

    let components = openapi.components.get_or_insert_with(Default::default);
    components.add_security_scheme(
        "bearer",
        SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
    );

    // utoipa-axum 0.1 has no `get_openapi_mut`; `routes` only extends paths and
    // component schemas, so tags and security schemes are set up front.
    OpenApiRouter::with_openapi(openapi)
        .routes(routes!(health::health))
        .routes(routes!(auth::register::register))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::me::me))
        .routes(routes!(auth::me::refresh))
        .routes(routes!(onboarding::setup))
        .routes(routes!(onboarding::get_profile, onboarding::put_profile))
        .routes(routes!(locations::update_location))
        .routes(routes!(locations::current_location))
        .routes(routes!(locations::location_history))
        .routes(routes!(locations::location_stats))
        .routes(routes!(reports::create_emergency_report))
        .routes(routes!(reports::create_auto_detection_report))
        .routes(routes!(reports::cancel_report))
        .routes(routes!(reports::report_status))
        .routes(routes!(reports::report_history))
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    fn non_empty(value: &str) -> Option<&str> {
        Some(value).filter(|value| !value.is_empty())
    }
    match author.split_once('<') {
        Some((name, email)) => (
            non_empty(name.trim()),
            non_empty(email.trim_end_matches('>').trim()),
        ),
        None => (non_empty(author.trim()), None),
    }
}
