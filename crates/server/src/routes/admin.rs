//! The admin page: one GET/POST endpoint whose POST dispatches on which form
//! key is present (`remove_tea`, `add_location`, `add_tea`, `update_tea`).
//! Mutations are permissive: a bad field is skipped or defaulted with a log
//! line, and the page re-renders from the store either way.

use axum::{extract::State, response::Html, Form};
use std::collections::HashMap;

use teashelf_core::{validate, NewTea, TeaUpdate};

use crate::error::PageError;
use crate::pages;
use crate::AppState;

type FormMap = HashMap<String, String>;

fn field<'f>(form: &'f FormMap, name: &str) -> Option<&'f str> {
    form.get(name).map(String::as_str)
}

fn is_id(raw: &str) -> bool {
    !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit())
}

/// GET / — render the admin page.
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    render(&state)
}

/// POST / — apply one admin action, then re-render.
pub async fn submit(
    State(state): State<AppState>,
    Form(form): Form<FormMap>,
) -> Result<Html<String>, PageError> {
    if let Some(raw) = field(&form, "remove_tea") {
        remove_tea(&state, raw);
    } else if form.contains_key("add_location") {
        add_location(&state, &form);
    } else if form.contains_key("add_tea") {
        add_tea(&state, &form);
    } else if form.contains_key("update_tea") {
        update_teas(&state, &form);
    }
    render(&state)
}

fn render(state: &AppState) -> Result<Html<String>, PageError> {
    let locations = state
        .db
        .list_locations()
        .map_err(PageError::from_db("list locations"))?;
    let teas = state
        .db
        .list_teas()
        .map_err(PageError::from_db("list teas"))?;
    Ok(Html(pages::admin(&teas, &locations)))
}

fn remove_tea(state: &AppState, raw: &str) {
    if !is_id(raw) {
        tracing::warn!("ignoring malformed tea id {raw:?}");
        return;
    }
    let tea_id: i64 = match raw.parse() {
        Ok(id) => id,
        Err(_) => return,
    };
    match state.db.remove_tea(tea_id) {
        Ok(true) => tracing::info!("deleted tea {tea_id}"),
        Ok(false) => tracing::warn!("tea {tea_id} not found"),
        Err(e) => tracing::error!("delete tea {tea_id}: {e}"),
    }
}

fn add_location(state: &AppState, form: &FormMap) {
    let name = match validate::location_name(field(form, "location_name")) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("invalid location data: {e}");
            return;
        }
    };
    let mut description =
        validate::trimmed(field(form, "location_desc"), validate::LOCATION_DESC_MAX);
    if description.is_empty() {
        description = name.clone();
    }
    match state.db.add_location(&name, &description) {
        Ok(Some(_)) => tracing::info!("added location: {name}"),
        Ok(None) => tracing::warn!("location {name:?} already exists"),
        Err(e) => tracing::error!("add location: {e}"),
    }
}

fn add_tea(state: &AppState, form: &FormMap) {
    let name = match validate::tea_name(field(form, "name")) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("invalid tea data: {e}");
            return;
        }
    };
    let tea = NewTea {
        name,
        kind: validate::trimmed(field(form, "type"), validate::TEA_TYPE_MAX),
        default_dose: validate::dose(field(form, "dose")),
        notes: validate::trimmed(field(form, "notes"), validate::NOTES_MAX),
        seller: validate::trimmed(field(form, "seller"), validate::SELLER_MAX),
        price_per_gram: validate::price(field(form, "price")),
        grams_bought: validate::grams(field(form, "grams_bought")),
    };
    match state.db.add_tea(&tea) {
        Ok(_) => tracing::info!("added tea: {}", tea.name),
        Err(e) => tracing::error!("add tea: {e}"),
    }
}

/// Bulk update: every known tea id is processed; a row with a blank name is
/// skipped (that tea stays untouched) while the rest still commit together.
fn update_teas(state: &AppState, form: &FormMap) {
    let tea_ids = match state.db.tea_ids() {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("list tea ids: {e}");
            return;
        }
    };
    let locations = match state.db.list_locations() {
        Ok(locations) => locations,
        Err(e) => {
            tracing::error!("list locations: {e}");
            return;
        }
    };

    let mut updates = Vec::with_capacity(tea_ids.len());
    for id in tea_ids {
        let name = match validate::tea_name(field(form, &format!("name_{id}"))) {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("validation error for tea {id}: {e}");
                continue;
            }
        };
        let amounts = locations
            .iter()
            .map(|location| {
                let key = format!("location_{}_{id}", location.id);
                (location.id, validate::grams(field(form, &key)))
            })
            .collect();
        updates.push(TeaUpdate {
            id,
            name,
            kind: validate::trimmed(field(form, &format!("type_{id}")), validate::TEA_TYPE_MAX),
            default_dose: validate::dose(field(form, &format!("dose_{id}"))),
            notes: validate::trimmed(field(form, &format!("notes_{id}")), validate::NOTES_MAX),
            seller: validate::trimmed(field(form, &format!("seller_{id}")), validate::SELLER_MAX),
            price_per_gram: validate::price(field(form, &format!("price_{id}"))),
            grams_bought: validate::grams(field(form, &format!("grams_bought_{id}"))),
            amounts,
        });
    }

    match state.db.update_teas(&updates) {
        Ok(count) => tracing::info!("updated {count} teas"),
        Err(e) => tracing::error!("update teas: {e}"),
    }
}
