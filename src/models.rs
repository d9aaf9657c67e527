use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::intake::{AcceptPolicy, Base64Reader, FileEntryView, IntakeController, RejectedFile};
use crate::llm::GenerativeModel;
use crate::recipe::RecipeService;
use crate::submission::Submission;

/* ---------- App state ---------- */
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub policy: AcceptPolicy,
    pub intake: Arc<IntakeController>,
    pub recipes: RecipeService,
    pub submission: Arc<Submission>,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config, model: Arc<dyn GenerativeModel>) -> Self {
        let policy = config.accept_policy();
        let reader = Arc::new(Base64Reader);
        let intake = IntakeController::new(policy.max_files, reader.clone());
        Self {
            config,
            policy,
            intake: Arc::new(intake),
            recipes: RecipeService::new(model, reader),
            submission: Arc::new(Submission::default()),
        }
    }
}

/* ---------- API models ---------- */

#[derive(Serialize, Debug)]
pub struct IntakeView {
    pub files: Vec<FileEntryView>,
    pub max_files: usize,
    pub accepting: bool,
    pub label: String,
}

#[derive(Serialize, Debug)]
pub struct UploadResult {
    pub accepted: Vec<FileEntryView>,
    pub rejected: Vec<RejectedFile>,
}

#[derive(Deserialize, Debug, Default)]
pub struct RecipePrompt {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RecipeText {
    pub text: String,
}
