//! Vision-model replies: prompt, reply classification and JSON normalization.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{DocumentError, ExtractionError};

use super::rules::{compact_iban, format_iban, validate_iban, LabelFields};
use super::Result;

/// Instruction sent with every document to the vision model.
pub const EXTRACTION_PROMPT: &str = r#"Tu es un expert en documents bancaires français.

Analyse ce RIB et renvoie STRICTEMENT ce JSON :

{
  "titulaire": "",
  "code_banque": "",
  "code_guichet": "",
  "numero_compte": "",
  "cle_rib": "",
  "iban": "",
  "bic": "",
  "domiciliation": ""
}

RÈGLES :
- Si une information est absente : mets "".
- Ne JAMAIS inventer.
- Ne JAMAIS mettre autre chose que le contenu demandé.
- "titulaire" doit contenir uniquement le nom du titulaire du compte.
- "domiciliation" doit contenir toutes les lignes visibles.
- Tu dois renvoyer UNIQUEMENT le JSON, sans texte autour.
"#;

/// Prefix of a raw reply carrying an API error object.
pub const API_ERROR_MARKER: &str = "__ERROR_API__";
/// Prefix of a raw reply without any candidate.
pub const NO_CANDIDATE_MARKER: &str = "__ERROR_NO_CANDIDATE__";
/// Prefix of a raw reply for a call that failed before answering.
pub const EXCEPTION_MARKER: &str = "__ERROR_EXCEPTION__";

lazy_static! {
    static ref JSON_FENCE: Regex = Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").unwrap();
    static ref ANY_FENCE: Regex = Regex::new(r"(?s)```\s*(\{.*?\})\s*```").unwrap();
}

/// Outcome of one vision-model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReply {
    /// Text produced by the model.
    Text(String),
    /// The API answered with an error object.
    ApiError(String),
    /// The API answered without any candidate.
    NoCandidate(String),
    /// The call failed (transport, timeout, decoding).
    Exception(String),
}

impl ModelReply {
    /// Classify a raw reply string using the error marker prefixes.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if let Some(detail) = trimmed.strip_prefix(API_ERROR_MARKER) {
            ModelReply::ApiError(detail.trim().to_string())
        } else if let Some(detail) = trimmed.strip_prefix(NO_CANDIDATE_MARKER) {
            ModelReply::NoCandidate(detail.trim().to_string())
        } else if let Some(detail) = trimmed.strip_prefix(EXCEPTION_MARKER) {
            ModelReply::Exception(detail.trim().to_string())
        } else {
            ModelReply::Text(raw.to_string())
        }
    }

    /// The model text, or the per-document error this reply stands for.
    pub fn text(&self) -> std::result::Result<&str, DocumentError> {
        match self {
            ModelReply::Text(text) => Ok(text.as_str()),
            ModelReply::ApiError(detail) => Err(DocumentError::ModelApi(detail.clone())),
            ModelReply::NoCandidate(detail) => Err(DocumentError::ModelNoCandidate(detail.clone())),
            ModelReply::Exception(detail) => Err(DocumentError::ModelException(detail.clone())),
        }
    }
}

/// Isolate the JSON object in a model reply.
///
/// A ```` ```json ```` fence wins, then any fence, then the first
/// brace-balanced span outside string literals.
pub fn extract_json_block(reply: &str) -> Option<&str> {
    if let Some(caps) = JSON_FENCE.captures(reply) {
        return caps.get(1).map(|m| m.as_str());
    }
    if let Some(caps) = ANY_FENCE.captures(reply) {
        return caps.get(1).map(|m| m.as_str());
    }
    balanced_object(reply)
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse the JSON object of a model reply.
pub fn parse_reply_object(reply: &str) -> Result<Map<String, Value>> {
    let block = extract_json_block(reply)
        .ok_or_else(|| ExtractionError::MalformedReply("no JSON object found".to_string()))?;
    match serde_json::from_str::<Value>(block) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(ExtractionError::MalformedReply(format!(
            "expected an object, got {}",
            other
        ))),
        Err(e) => Err(ExtractionError::MalformedReply(e.to_string())),
    }
}

/// Normalized fields read from a model reply, ready for reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelFields {
    pub labels: LabelFields,
    pub iban: Option<String>,
    pub bic: Option<String>,
}

impl ModelFields {
    /// Parse and normalize a model text reply.
    pub fn from_reply(reply: &str) -> Result<Self> {
        let object = parse_reply_object(reply)?;
        let fields = Self::from_object(&object);
        debug!("Model reply parsed, iban present: {}", fields.iban.is_some());
        Ok(fields)
    }

    /// Normalize the eight keys of the reply object.
    ///
    /// Values that do not have the expected shape are dropped.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let field = |key: &str| text_value(object, key);

        let labels = LabelFields {
            bank_code: field("code_banque").and_then(|v| digits_exact(&v, 5)),
            branch_code: field("code_guichet").and_then(|v| digits_exact(&v, 5)),
            account_number: field("numero_compte").and_then(|v| account(&v)),
            rib_key: field("cle_rib").and_then(|v| digits_exact(&v, 2)),
            holder_name: field("titulaire"),
            domiciliation: field("domiciliation").and_then(|v| domiciliation(&v)),
        };

        Self {
            labels,
            iban: field("iban").and_then(|v| iban(&v)),
            bic: field("bic").and_then(|v| bic(&v)),
        }
    }
}

fn text_value(object: &Map<String, Value>, key: &str) -> Option<String> {
    let value = match object.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

fn digits_exact(value: &str, len: usize) -> Option<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == len).then_some(digits)
}

fn account(value: &str) -> Option<String> {
    let account: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    (5..=34).contains(&account.len()).then_some(account)
}

fn iban(value: &str) -> Option<String> {
    let compacted = compact_iban(value);
    validate_iban(&compacted).then(|| format_iban(&compacted))
}

fn bic(value: &str) -> Option<String> {
    let mut code: String = value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase();
    match code.len() {
        n if n >= 11 => code.truncate(11),
        n if n >= 8 => code.truncate(8),
        _ => return None,
    }
    code[..6]
        .chars()
        .all(|c| c.is_ascii_alphabetic())
        .then_some(code)
}

fn domiciliation(value: &str) -> Option<String> {
    let lines: Vec<&str> = value
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}
