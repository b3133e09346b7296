//! Conversation analysis: transcript plus a naive two-speaker split

use crate::{
    error::AppError,
    genai::{ContentPart, GenerativeModel},
    models::analysis::{ConversationAnalysis, SpeakerTurn},
    services::UploadedFile,
};
use std::sync::Arc;

const TRANSCRIBE_PROMPT: &str =
    "Transcribe this audio conversation verbatim. Respond with the transcript text only.";

pub struct ConversationService {
    model: Arc<dyn GenerativeModel>,
}

impl ConversationService {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn analyze_audio(&self, audio: UploadedFile) -> Result<ConversationAnalysis, AppError> {
        if audio.data.is_empty() {
            return Err(AppError::BadRequest("Uploaded audio file is empty".to_string()));
        }

        let mime_type = audio.mime_or("audio/", "audio/wav");
        let transcript = self
            .model
            .generate(vec![
                ContentPart::text(TRANSCRIBE_PROMPT),
                ContentPart::inline(mime_type, audio.data),
            ])
            .await?
            .trim()
            .to_string();

        tracing::debug!(words = transcript.split_whitespace().count(), "Transcript received");

        Ok(ConversationAnalysis {
            diarization: split_two_speakers(&transcript),
            transcript,
        })
    }
}

/// Split the transcript's words in half between "Speaker 1" and "Speaker 2"
pub fn split_two_speakers(transcript: &str) -> Vec<SpeakerTurn> {
    let words: Vec<&str> = transcript.split_whitespace().collect();
    let mid = words.len() / 2;

    vec![
        SpeakerTurn {
            speaker: "Speaker 1".to_string(),
            text: words[..mid].join(" "),
        },
        SpeakerTurn {
            speaker: "Speaker 2".to_string(),
            text: words[mid..].join(" "),
        },
    ]
}
