//! Messages API request assembly
//!
//! The body carries the compressed screenshots, the action log and the
//! instruction prompt. It never carries the credential.

use crate::artifacts::CompiledArtifactSet;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Service-side request size ceiling
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 32 * 1024 * 1024;

/// Messages API request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

impl ImageSource {
    fn jpeg(bytes: &[u8]) -> Self {
        Self {
            kind: "base64".to_string(),
            media_type: "image/jpeg".to_string(),
            data: STANDARD.encode(bytes),
        }
    }
}

/// A serialized request ready for the transport
#[derive(Debug, Clone)]
pub struct SkillRequest {
    pub model: String,
    pub image_count: usize,
    pub body: Vec<u8>,
}

impl SkillRequest {
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

const ELEMENT_NOTE: &str = r#"
Note: Click actions include "element" data with accessibility information:
- "role": The type of UI element (button, text field, menu item, etc.)
- "name": The element's label or text
- "parent": The parent container's name

Use this semantic information to make the skill RESILIENT. Reference elements by their
role and name (e.g., "click the Submit button") rather than coordinates, so the skill
keeps working when the layout changes slightly.
"#;

const SKILL_INSTRUCTIONS: &str = r#"
Based on the screenshots and actions above, analyze what task the user performed.
Generate a SKILL.md file that automates this task using computer use tools.

The SKILL.md should:
1. Have a clear title and description of the task
2. List prerequisites (apps that need to be open, etc.)
3. Provide step-by-step instructions that an AI with computer-use tools can follow
4. Reference UI elements by their semantic names (from element data) when available, not just coordinates
5. Be robust and generalize to similar inputs
6. Use markdown formatting

Keystrokes shown as "[REDACTED]" were typed into a sensitive field. Never guess their
value; instruct the executing AI to ask the user for it.

IMPORTANT: Add a "Clarification Protocol" section that instructs the executing AI to:
- Before each major step, verify the expected UI state matches what's on screen
- If the UI looks significantly different (new layout, missing elements, unexpected dialog):
  1. PAUSE execution
  2. Take a screenshot of the current state
  3. Ask the user: "The interface looks different than expected. [describe what's different]. Should I: (a) attempt to adapt, (b) show you what I see, or (c) abort?"
- If an element cannot be found after 3 attempts, ask for user guidance

Return ONLY the SKILL.md content, nothing else.
"#;

/// Text block with the action log and the document instructions
pub fn instruction_prompt(actions_json: &str, has_element_info: bool) -> String {
    let mut prompt = String::new();
    prompt.push_str("\nHere are the user's mouse clicks and keyboard inputs with timestamps:\n\n");
    prompt.push_str("```json\n");
    prompt.push_str(actions_json);
    prompt.push_str("\n```\n");
    if has_element_info {
        prompt.push_str(ELEMENT_NOTE);
    }
    prompt.push_str(SKILL_INSTRUCTIONS);
    prompt
}

/// Content blocks for one artifact set: caption + image per screenshot, then
/// the instruction prompt.
pub fn content_blocks(set: &CompiledArtifactSet) -> crate::Result<Vec<ContentBlock>> {
    let total = set.images.len();
    let mut blocks = Vec::with_capacity(total * 2 + 1);
    for (i, image) in set.images.iter().enumerate() {
        blocks.push(ContentBlock::Text { text: format!("Screenshot {} of {}:", i + 1, total) });
        blocks.push(ContentBlock::Image { source: ImageSource::jpeg(&image.jpeg) });
    }
    let has_element_info = set.actions.iter().any(|a| a.element().is_some());
    blocks.push(ContentBlock::Text {
        text: instruction_prompt(&set.actions_json()?, has_element_info),
    });
    Ok(blocks)
}

/// Image count that should fit under `limit`, given the current body
fn suggested_image_count(size: usize, image_bytes: usize, image_count: usize, limit: usize) -> usize {
    if image_count == 0 || image_bytes == 0 {
        return 0;
    }
    let fixed = size.saturating_sub(image_bytes);
    let per_image = image_bytes.div_ceil(image_count);
    let fits = limit.saturating_sub(fixed) / per_image;
    fits.min(image_count.saturating_sub(1))
}

/// Serialize the request, refusing bodies above `max_request_bytes`
pub fn build_request(
    set: &CompiledArtifactSet,
    model: &str,
    max_tokens: u32,
    max_request_bytes: usize,
) -> crate::Result<SkillRequest> {
    let request = MessagesRequest {
        model: model.to_string(),
        max_tokens,
        messages: vec![Message { role: "user".to_string(), content: content_blocks(set)? }],
    };
    let body = serde_json::to_vec(&request)?;

    if body.len() > max_request_bytes {
        let image_bytes: usize = request.messages[0]
            .content
            .iter()
            .map(|b| match b {
                ContentBlock::Image { source } => source.data.len(),
                ContentBlock::Text { .. } => 0,
            })
            .sum();
        return Err(crate::Error::PayloadTooLarge {
            size: body.len(),
            limit: max_request_bytes,
            suggested_max: suggested_image_count(
                body.len(),
                image_bytes,
                set.images.len(),
                max_request_bytes,
            ),
        });
    }

    debug!(model, bytes = body.len(), images = set.images.len(), "Request built");
    Ok(SkillRequest { model: model.to_string(), image_count: set.images.len(), body })
}
