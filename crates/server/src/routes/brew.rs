//! The two-step brew flow: pick a location, then confirm brews of whatever
//! tea has the most grams left there. Confirming redirects back to the same
//! page so the next-largest tea comes up.

use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use std::collections::HashMap;

use teashelf_core::validate;

use crate::error::PageError;
use crate::pages;
use crate::AppState;

type FormMap = HashMap<String, String>;

/// GET /brew — landing page.
pub async fn landing() -> Html<String> {
    Html(pages::brew_landing())
}

/// POST /brew — on to location selection.
pub async fn landing_post() -> Redirect {
    Redirect::to("/select_location")
}

/// GET /select_location — list locations with their brewable-tea counts.
pub async fn select_location(State(state): State<AppState>) -> Result<Html<String>, PageError> {
    render_select(&state)
}

/// POST /select_location — redirect to the chosen location's brew page;
/// a missing or malformed id just re-renders the list.
pub async fn select_location_post(
    State(state): State<AppState>,
    Form(form): Form<FormMap>,
) -> Result<Response, PageError> {
    if let Some(raw) = form.get("location") {
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Redirect::to(&format!("/brew_result/{raw}")).into_response());
        }
    }
    Ok(render_select(&state)?.into_response())
}

fn render_select(state: &AppState) -> Result<Html<String>, PageError> {
    let summaries = state
        .db
        .location_summaries()
        .map_err(PageError::from_db("list location summaries"))?;
    Ok(Html(pages::select_location(&summaries)))
}

/// GET /brew_result/{location_id} — show the current pick, or the empty
/// state once nothing positive remains.
pub async fn brew_result(
    State(state): State<AppState>,
    Path(location_id): Path<i64>,
) -> Result<Response, PageError> {
    let Some(location) = state
        .db
        .location(location_id)
        .map_err(PageError::from_db("load location"))?
    else {
        tracing::warn!("location {location_id} not found");
        return Ok(Redirect::to("/select_location").into_response());
    };
    let pick = state
        .db
        .best_tea_at(location.id)
        .map_err(PageError::from_db("select tea"))?;
    Ok(Html(pages::brew_result(&location, pick.as_ref())).into_response())
}

/// POST /brew_result/{location_id} — confirm the brew (with an optional
/// review), then redirect to the same page.
pub async fn confirm(
    State(state): State<AppState>,
    Path(location_id): Path<i64>,
    Form(form): Form<FormMap>,
) -> Result<Response, PageError> {
    let Some(location) = state
        .db
        .location(location_id)
        .map_err(PageError::from_db("load location"))?
    else {
        tracing::warn!("location {location_id} not found");
        return Ok(Redirect::to("/select_location").into_response());
    };
    let pick = state
        .db
        .best_tea_at(location.id)
        .map_err(PageError::from_db("select tea"))?;
    if let Some(pick) = pick {
        let review = validate::trimmed(
            form.get("review").map(String::as_str),
            validate::REVIEW_MAX,
        );
        // A failed write still redirects; the next GET re-reads the store.
        if let Err(e) = state.db.record_brew(&pick, &location, &review) {
            tracing::error!("record brew: {e}");
        }
    }
    Ok(Redirect::to(&format!("/brew_result/{location_id}")).into_response())
}
