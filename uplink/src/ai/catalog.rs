//! Model catalog and registry
//!
//! Maps the stable, client-facing model slots to concrete upstream models. Clients only
//! ever see slot ids like `chat-model-small`; which provider and upstream model serves a
//! slot is decided here and nowhere else, so upstream swaps never leak into clients.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::ProvidersConfig;

use super::providers::openai_compat::{HostedChatModel, HostedImageModel};
use super::providers::{ImageModel, LanguageModel};
use super::reasoning::ExtractReasoning;

/// Slot served when a chat request does not name a model
pub const DEFAULT_CHAT_MODEL: &str = "chat-model-small";

/// Stable identifiers for the language models the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LanguageModelSlot {
    ChatModelSmall,
    ChatModelLarge,
    ChatModelReasoning,
    TitleModel,
    ArtifactModel,
}

impl LanguageModelSlot {
    pub const ALL: [Self; 5] = [
        Self::ChatModelSmall,
        Self::ChatModelLarge,
        Self::ChatModelReasoning,
        Self::TitleModel,
        Self::ArtifactModel,
    ];

    /// Wire id of this slot, identical to its serde form.
    pub fn id(&self) -> &'static str {
        match self {
            Self::ChatModelSmall => "chat-model-small",
            Self::ChatModelLarge => "chat-model-large",
            Self::ChatModelReasoning => "chat-model-reasoning",
            Self::TitleModel => "title-model",
            Self::ArtifactModel => "artifact-model",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.id() == id)
    }
}

/// Stable identifiers for the image models the service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ImageModelSlot {
    SmallModel,
    LargeModel,
}

impl ImageModelSlot {
    pub const ALL: [Self; 2] = [Self::SmallModel, Self::LargeModel];

    pub fn id(&self) -> &'static str {
        match self {
            Self::SmallModel => "small-model",
            Self::LargeModel => "large-model",
        }
    }
}

/// All models the service can serve, resolved once at startup.
pub struct ModelRegistry {
    language: HashMap<LanguageModelSlot, Arc<dyn LanguageModel>>,
    image: HashMap<ImageModelSlot, Arc<dyn ImageModel>>,
}

impl ModelRegistry {
    pub fn from_config(providers: &ProvidersConfig) -> Self {
        Self {
            language: LanguageModelSlot::ALL
                .into_iter()
                .map(|slot| (slot, build_language_model(slot, providers)))
                .collect(),
            image: ImageModelSlot::ALL
                .into_iter()
                .map(|slot| (slot, build_image_model(slot, providers)))
                .collect(),
        }
    }

    /// The model backing a language slot. Every slot is inserted at construction.
    pub fn language_model(&self, slot: LanguageModelSlot) -> Arc<dyn LanguageModel> {
        Arc::clone(&self.language[&slot])
    }

    /// The model backing an image slot. Every slot is inserted at construction.
    pub fn image_model(&self, slot: ImageModelSlot) -> Arc<dyn ImageModel> {
        Arc::clone(&self.image[&slot])
    }

    /// Look up a chat model by its wire id.
    pub fn resolve_chat_model(&self, id: &str) -> Option<(LanguageModelSlot, Arc<dyn LanguageModel>)> {
        let slot = LanguageModelSlot::from_id(id)?;
        Some((slot, self.language_model(slot)))
    }
}

fn build_language_model(
    slot: LanguageModelSlot,
    providers: &ProvidersConfig,
) -> Arc<dyn LanguageModel> {
    match slot {
        LanguageModelSlot::ChatModelSmall
        | LanguageModelSlot::TitleModel
        | LanguageModelSlot::ArtifactModel => {
            Arc::new(HostedChatModel::new(&providers.google, "gemini-2.0-flash-001"))
        }
        LanguageModelSlot::ChatModelLarge => {
            Arc::new(HostedChatModel::new(&providers.google, "gemini-1.5-pro-latest"))
        }
        LanguageModelSlot::ChatModelReasoning => Arc::new(ExtractReasoning::new(
            HostedChatModel::new(&providers.google, "gemini-2.0-flash-thinking-exp"),
            "think",
        )),
    }
}

fn build_image_model(slot: ImageModelSlot, providers: &ProvidersConfig) -> Arc<dyn ImageModel> {
    match slot {
        ImageModelSlot::SmallModel => {
            Arc::new(HostedImageModel::new(&providers.openai, "dall-e-2"))
        }
        ImageModelSlot::LargeModel => {
            Arc::new(HostedImageModel::new(&providers.openai, "dall-e-3"))
        }
    }
}

/// A user-selectable chat model as shown in the model picker.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct ChatModelDescriptor {
    #[serde(rename = "id")]
    pub slot: LanguageModelSlot,
    pub name: &'static str,
    pub description: &'static str,
}

impl ChatModelDescriptor {
    /// The models users can pick from. Title and artifact slots are internal.
    pub const ALL: [Self; 3] = [
        Self {
            slot: LanguageModelSlot::ChatModelSmall,
            name: "Small model",
            description: "Small model for fast, lightweight tasks",
        },
        Self {
            slot: LanguageModelSlot::ChatModelLarge,
            name: "Large model",
            description: "Large model for complex, multi-step tasks",
        },
        Self {
            slot: LanguageModelSlot::ChatModelReasoning,
            name: "Reasoning model",
            description: "Uses advanced reasoning",
        },
    ];
}
