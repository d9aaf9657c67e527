use axum::{Json, extract::State};

use crate::error::AppResult;
use crate::models::{AppState, RecipePrompt, RecipeText};
use crate::submission::SubmissionState;

/// State of the last submission.
///
/// # Errors
/// Never; the signature matches the other handlers.
pub async fn get(State(state): State<AppState>) -> AppResult<Json<SubmissionState>> {
    Ok(Json(state.submission.current()))
}

/// Ask for a recipe using the prompt and the first selected file.
///
/// The model call runs on its own task so a dropped connection does not
/// leave the submission stuck in `pending`.
///
/// # Errors
///
/// 409 while another submission is pending, 502 if the model call fails.
pub async fn submit(
    State(state): State<AppState>,
    Json(body): Json<RecipePrompt>,
) -> AppResult<Json<RecipeText>> {
    state.submission.begin()?;

    let file = state.intake.first_blob();
    let recipes = state.recipes.clone();
    let submission = state.submission.clone();
    let joined = tokio::spawn(async move {
        let result = recipes.generate_recipe(&body.prompt, file.as_ref()).await;
        submission.finish(&result);
        result
    })
    .await;
    let result = match joined {
        Ok(result) => result,
        Err(e) => {
            state.submission.finish(&Err::<String, _>(&e));
            return Err(e.into());
        }
    };

    Ok(Json(RecipeText { text: result? }))
}
