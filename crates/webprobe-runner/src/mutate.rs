//! Request body mutation for fuzz and SQL-injection probes
//!
//! Mutation keeps the body's shape: form fields keep their keys, JSON keeps
//! its containers and key set, only leaves are replaced.

use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;

use webprobe_core::{HttpRequest, RequestBody};

/// ASCII printable characters, whitespace included.
const PRINTABLE: &[u8] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~ \t\n\r\x0b\x0c";

/// Longest generated string
const MAX_RANDOM_LEN: usize = 10;

/// Numeric leaves are drawn from this range
const NUMERIC_BOUND: i64 = 50;

/// Random printable string of 1..=10 characters
pub fn random_printable(rng: &mut impl Rng) -> String {
    let len = rng.gen_range(1..=MAX_RANDOM_LEN);
    (0..len)
        .map(|_| char::from(PRINTABLE[rng.gen_range(0..PRINTABLE.len())]))
        .collect()
}

/// Where replacement strings come from.
#[derive(Debug, Clone, Copy)]
pub enum Replacement<'a> {
    /// Freshly generated printable strings
    Random,
    /// Uniform pick from a payload list
    Wordlist(&'a [String]),
}

impl Replacement<'_> {
    /// Next replacement string. Payload lists must be non-empty;
    /// [`WordlistCache`](crate::WordlistCache) refuses to hand out empty ones.
    pub fn draw(&self, rng: &mut impl Rng) -> String {
        match self {
            Self::Random => random_printable(rng),
            Self::Wordlist(words) => {
                debug_assert!(!words.is_empty(), "draw from an empty payload list");
                words.choose(rng).cloned().unwrap_or_default()
            }
        }
    }
}

/// Copy of `request` with its body mutated.
pub fn mutate_request(request: &HttpRequest, with: Replacement<'_>, rng: &mut impl Rng) -> HttpRequest {
    let mut mutated = request.clone();
    mutated.body = mutate_body(&request.body, with, rng);
    mutated
}

pub fn mutate_body(body: &RequestBody, with: Replacement<'_>, rng: &mut impl Rng) -> RequestBody {
    match body {
        RequestBody::Form(fields) => {
            let mut fields = fields.clone();
            for element in fields.elements.iter_mut().filter(|e| e.enabled) {
                element.value = with.draw(rng);
            }
            RequestBody::Form(fields)
        }
        RequestBody::Raw(_) => RequestBody::Raw(with.draw(rng)),
        RequestBody::Json(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                let mutated = mutate_json(&value, with, rng);
                RequestBody::Json(serde_json::to_string(&mutated).unwrap_or_default())
            }
            // Unparsable templates are rejected by validation; fall back to a whole-body draw.
            Err(_) => RequestBody::Json(with.draw(rng)),
        },
    }
}

/// Replace every leaf of `value`, keeping containers and keys.
pub fn mutate_json(value: &Value, with: Replacement<'_>, rng: &mut impl Rng) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), mutate_json(v, with, rng)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| mutate_json(v, with, rng)).collect()),
        Value::String(_) => Value::String(with.draw(rng)),
        Value::Number(n) if n.is_f64() => {
            Value::from(rng.gen_range(-(NUMERIC_BOUND as f64)..NUMERIC_BOUND as f64))
        }
        Value::Number(_) => Value::from(rng.gen_range(-NUMERIC_BOUND..=NUMERIC_BOUND)),
        Value::Bool(_) => Value::Bool(rng.gen_bool(0.5)),
        Value::Null => Value::Null,
    }
}
