use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::character::{Attributes, CharacterRecord, Profession, Race, ValidationReport, MAX_ALBUM_PHOTOS};
use crate::models::{AppState, SubmitCharacterResponse};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/characters/options", get(options))
        .route("/api/characters/validate", post(validate_character))
        .route("/api/characters", post(submit_character))
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CharacterOptions {
    races: Vec<Race>,
    professions: Vec<Profession>,
    attributes: Vec<&'static str>,
    point_budget: u32,
    max_album_photos: usize,
    defaults: Attributes,
}

async fn options(State(state): State<AppState>) -> Json<CharacterOptions> {
    Json(CharacterOptions {
        races: Race::ALL.to_vec(),
        professions: Profession::ALL.to_vec(),
        attributes: Attributes::NAMES.to_vec(),
        point_budget: state.config.character.point_budget,
        max_album_photos: MAX_ALBUM_PHOTOS,
        defaults: Attributes::default(),
    })
}

/// Change-time feedback: always 200, the report says whether the sheet is valid.
async fn validate_character(
    State(state): State<AppState>,
    payload: Result<Json<CharacterRecord>, JsonRejection>,
) -> AppResult<Json<ValidationReport>> {
    let Json(record) = payload?;
    Ok(Json(record.validate_report(state.config.character.point_budget)))
}

async fn submit_character(
    payload: Result<Json<CharacterRecord>, JsonRejection>,
) -> AppResult<Json<SubmitCharacterResponse>> {
    let Json(record) = payload?;

    let violations = record.violations();
    if !violations.is_empty() {
        return Err(AppError::InvalidCharacter(violations));
    }

    info!(
        name = %record.name,
        photos = record.album.len(),
        "Character submitted"
    );

    Ok(Json(SubmitCharacterResponse {
        success: true,
        message: format!("Player「{}」has been created successfully!", record.name),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(Config::in_memory()).unwrap())
    }

    async fn post_json(uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn sheet(name: &str) -> serde_json::Value {
        serde_json::json!({
            "name": name,
            "race": "Elf",
            "profession": "Mage",
            "attributes": {
                "strength": 20, "dexterity": 15, "constitution": 15,
                "intelligence": 15, "wisdom": 15, "charisma": 15
            }
        })
    }

    #[tokio::test]
    async fn test_submit_valid_character() {
        let (status, body) = post_json("/api/characters", sheet("Legolas")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Player「Legolas」has been created successfully!");
    }

    #[tokio::test]
    async fn test_submit_invalid_character_lists_violations() {
        let (status, body) = post_json("/api/characters", sheet("L")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["violations"][0]["field"], "name");
        assert_eq!(body["violations"][0]["code"], "name_too_short");
    }

    #[tokio::test]
    async fn test_validate_reports_budget_without_blocking() {
        let (status, body) = post_json("/api/characters/validate", sheet("Legolas")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["points"]["remaining"], -5);
        assert_eq!(body["points"]["overBudget"], true);
    }

    #[tokio::test]
    async fn test_malformed_sheet_is_bad_request() {
        let (status, _) = post_json("/api/characters", serde_json::json!({ "name": 42 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_options() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/characters/options")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["races"].as_array().unwrap().len(), 4);
        assert_eq!(body["pointBudget"], 90);
        assert_eq!(body["maxAlbumPhotos"], 20);
    }
}
