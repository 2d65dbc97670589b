//! Claude Messages API backend for the judge, critic and writer.

use async_trait::async_trait;
use leverage_core::{AnnotatedExample, Candidate, Critique};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{GenerateError, LlmError};
use crate::prompt::{JUDGE_SYSTEM_PROMPT, extract_json_object, judge_prompt, parse_judgment};
use crate::retry::RetryPolicy;
use crate::traits::{ContentGenerator, Critic, GenerationRequest, Judge, JudgeRequest, Judgment};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

const JUDGE_TEMPERATURE: f32 = 0.0;
const CRITIC_TEMPERATURE: f32 = 0.3;
const WRITER_TEMPERATURE: f32 = 0.7;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    fn text(&self) -> Option<String> {
        let text: String = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Thin Claude client.
///
/// `complete` makes exactly one HTTP call. The critic and writer wrap it in
/// `retry`; judged scorers apply their own policy around [`Judge::judge`].
#[derive(Clone)]
pub struct Claude {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            max_tokens: 2048,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| LlmError::MissingApiKey("ANTHROPIC_API_KEY"))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| LlmError::MissingApiKey("ANTHROPIC_API_KEY"))?;
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    /// One system + user turn; returns the concatenated text blocks.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/messages", self.base_url);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature,
            system,
            messages: vec![WireMessage {
                role: "user",
                content: user,
            }],
        };

        debug!(model = %self.model, prompt_bytes = user.len(), "Claude request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Malformed {
                reason: format!("unexpected response shape: {e}"),
                raw: body.clone(),
            })?;
        parsed.text().ok_or_else(|| LlmError::Malformed {
            reason: "no text content".into(),
            raw: body,
        })
    }
}

#[async_trait]
impl Judge for Claude {
    async fn judge(&self, request: &JudgeRequest<'_>) -> Result<Judgment, LlmError> {
        let prompt = judge_prompt(request);
        let raw = self
            .complete(JUDGE_SYSTEM_PROMPT, &prompt, JUDGE_TEMPERATURE)
            .await?;
        parse_judgment(&raw)
    }
}

// =============================================================================
// Critic
// =============================================================================

const CRITIC_SYSTEM_PROMPT: &str = "You are a senior industry analyst with fifteen \
years of experience. You read every earnings report and know the unit economics of \
every major player by heart. You are tired of surface-level analysis on LinkedIn \
that gets shared around by people who don't understand the industry. Be ruthless: \
if the logic is weak, say so; if a number doesn't make sense, say so.";

fn critic_prompt(reference: &str, candidate: &str) -> String {
    let mut out = String::new();
    if !reference.trim().is_empty() {
        out.push_str("CONTEXT:\n");
        out.push_str(reference.trim());
        out.push_str("\n\n");
    }
    out.push_str("POST:\n");
    out.push_str(candidate.trim());
    out.push_str(
        "\n\nAnswer two questions with brutal honesty.\n\n\
         1. EMOTIONAL INTELLIGENCE TEST: Did this post make you feel smarter? Did you get \
         the intellectual click of understanding something at a deeper level, or was it \
         surface-level analysis you already knew?\n\n\
         2. SOCIAL CAPITAL TEST: Would you repost this to your professional network? Would \
         sharing it make you look more discerning to your peers, or dilute your brand?\n\n\
         Judge by: is the insight non-obvious, are the numbers specific and verifiable, does \
         the logic hold, is the mechanism compelling or hand-wavy, would an operator nod \
         along or roll their eyes.\n\n\
         Respond with JSON only:\n\
         {\"emotionalIntelligenceTest\": true, \"socialCapitalTest\": true, \
         \"overallPass\": true, \"specificIssues\": [\"...\"], \
         \"specificStrengths\": [\"...\"], \"recommendations\": [\"...\"], \
         \"brutalTruth\": \"one paragraph\"}",
    );
    out
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCritique {
    #[serde(alias = "feelsSmarter")]
    emotional_intelligence_test: bool,
    #[serde(alias = "wouldShare")]
    social_capital_test: bool,
    overall_pass: bool,
    #[serde(default, alias = "issues")]
    specific_issues: Vec<String>,
    #[serde(default, alias = "strengths")]
    specific_strengths: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    brutal_truth: String,
}

pub fn parse_critique(raw: &str) -> Result<Critique, LlmError> {
    let body = extract_json_object(raw).ok_or_else(|| LlmError::Malformed {
        reason: "no JSON object in critique".into(),
        raw: raw.to_string(),
    })?;
    let parsed: RawCritique = serde_json::from_str(body).map_err(|e| LlmError::Malformed {
        reason: e.to_string(),
        raw: raw.to_string(),
    })?;
    Ok(Critique {
        feels_smarter: parsed.emotional_intelligence_test,
        would_share: parsed.social_capital_test,
        overall_pass: parsed.overall_pass,
        issues: parsed.specific_issues,
        strengths: parsed.specific_strengths,
        recommendations: parsed.recommendations,
        brutal_truth: parsed.brutal_truth,
    })
}

#[async_trait]
impl Critic for Claude {
    async fn critique(&self, reference: &str, candidate: &str) -> Result<Critique, LlmError> {
        let prompt = critic_prompt(reference, candidate);
        let prompt = prompt.as_str();
        self.retry
            .run("critic", || async move {
                let raw = self
                    .complete(CRITIC_SYSTEM_PROMPT, prompt, CRITIC_TEMPERATURE)
                    .await?;
                parse_critique(&raw)
            })
            .await
    }
}

// =============================================================================
// Writer
// =============================================================================

const WRITER_SYSTEM_PROMPT: &str = "You write LinkedIn posts that make smart readers \
feel smarter. Rules: first line is a hook built on specific numbers; short paragraphs \
of two or three sentences; 8 to 15 specific numbers; 200 to 300 words; confident but \
not arrogant; slightly contrarian and backed by evidence; end on a broader business \
principle. Never use markdown bold, emojis, questions to the reader, generic business \
speak, or cringy phrases like \"let that sink in\" or \"here's the kicker\". \
Output only the post text.";

/// LLM-backed [`ContentGenerator`] that imitates a set of voice examples.
pub struct ClaudeWriter {
    claude: Claude,
    voice_examples: Vec<AnnotatedExample>,
}

impl ClaudeWriter {
    pub fn new(claude: Claude, voice_examples: Vec<AnnotatedExample>) -> Self {
        Self {
            claude,
            voice_examples,
        }
    }

    fn examples_block(&self) -> String {
        if self.voice_examples.is_empty() {
            return String::new();
        }
        let mut out = String::from("POSTS TO STUDY (match this voice and structure):\n\n");
        for example in &self.voice_examples {
            out.push_str(&example.format_for_prompt());
            out.push_str("\n---\n\n");
        }
        out
    }

    fn draft_prompt(&self, request: &GenerationRequest) -> String {
        format!(
            "{}INSIGHT AND RESEARCH:\n{}\n\nWrite the post.",
            self.examples_block(),
            request.context.trim()
        )
    }

    fn revision_prompt(&self, request: &GenerationRequest, previous: &Candidate) -> String {
        let brief = request
            .feedback
            .as_ref()
            .map(|r| r.revision_brief())
            .unwrap_or_default();
        format!(
            "{}INSIGHT AND RESEARCH:\n{}\n\nCURRENT DRAFT (revision {}):\n{}\n\n\
             EDITOR FEEDBACK:\n{}\n\
             Rewrite the post to fix every issue while keeping what works. \
             Do not just tweak wording; fix the substance.",
            self.examples_block(),
            request.context.trim(),
            previous.revision(),
            previous.text(),
            brief
        )
    }
}

/// Drop a wrapping JSON envelope (`{"post": "..."}`) if the model added one.
fn unwrap_post(raw: &str) -> String {
    #[derive(Deserialize)]
    struct Envelope {
        post: String,
    }
    extract_json_object(raw)
        .and_then(|body| serde_json::from_str::<Envelope>(body).ok())
        .map(|e| e.post)
        .unwrap_or_else(|| raw.trim().to_string())
}

#[async_trait]
impl ContentGenerator for ClaudeWriter {
    async fn generate(&self, request: &GenerationRequest) -> Result<Candidate, GenerateError> {
        let prompt = match &request.previous {
            Some(previous) => self.revision_prompt(request, previous),
            None => self.draft_prompt(request),
        };
        let (claude, prompt) = (&self.claude, prompt.as_str());
        let raw = claude
            .retry
            .run("writer", move || {
                claude.complete(WRITER_SYSTEM_PROMPT, prompt, WRITER_TEMPERATURE)
            })
            .await?;
        let text = unwrap_post(&raw);
        if text.trim().is_empty() {
            return Err(GenerateError::Empty);
        }
        let candidate = request.candidate(text);
        info!(
            revision = candidate.revision(),
            words = candidate.word_count(),
            "drafted candidate"
        );
        Ok(candidate)
    }

    async fn fresh_context(&self, discarded: &str) -> Result<String, GenerateError> {
        let prompt = format!(
            "This angle was judged fundamentally weak:\n{}\n\n\
             Propose a different, non-obvious angle on the same subject that can be \
             backed by specific numbers. Reply with the new insight and the supporting \
             data points only.",
            discarded.trim()
        );
        let (claude, prompt) = (&self.claude, prompt.as_str());
        let raw = claude
            .retry
            .run("fresh_context", move || {
                claude.complete(WRITER_SYSTEM_PROMPT, prompt, WRITER_TEMPERATURE)
            })
            .await?;
        let context = raw.trim().to_string();
        if context.is_empty() {
            return Err(GenerateError::Empty);
        }
        Ok(context)
    }
}
