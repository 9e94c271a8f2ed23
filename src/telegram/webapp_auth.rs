//! Проверка подписи Telegram WebApp initData.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Максимальный возраст initData: сутки
const INIT_DATA_MAX_AGE_SECS: i64 = 86_400;

/// Validates the raw `initData` query string and returns the embedded
/// `user` JSON object.
///
/// Implements the documented WebApp check: the secret key is the
/// HMAC-SHA256 of the bot token keyed with "WebAppData", and the
/// received hash must equal the HMAC of the sorted `key=value` lines
/// (hash excluded, values URL-decoded). Signed data older than a day
/// is rejected to limit replay.
pub fn validate_init_data(init_data: &str, bot_token: &str) -> Result<serde_json::Value, String> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut received_hash: Option<String> = None;

    for item in init_data.split('&') {
        let Some((key, value)) = item.split_once('=') else {
            continue;
        };
        let decoded = urlencoding::decode(value)
            .map_err(|e| format!("Failed to decode initData value: {}", e))?
            .to_string();
        if key == "hash" {
            received_hash = Some(decoded);
        } else {
            pairs.push((key.to_string(), decoded));
        }
    }

    let received_hash = received_hash.ok_or_else(|| "No hash in initData".to_string())?;

    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    let data_check_string = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n");

    let mut secret = HmacSha256::new_from_slice(b"WebAppData")
        .map_err(|e| format!("HMAC init error: {}", e))?;
    secret.update(bot_token.as_bytes());
    let secret_key = secret.finalize().into_bytes();

    let mut mac =
        HmacSha256::new_from_slice(&secret_key).map_err(|e| format!("HMAC init error: {}", e))?;
    mac.update(data_check_string.as_bytes());
    let calculated_hash = hex::encode(mac.finalize().into_bytes());

    if calculated_hash != received_hash {
        return Err("initData signature mismatch".to_string());
    }

    let auth_date = pairs
        .iter()
        .find(|(k, _)| k == "auth_date")
        .and_then(|(_, v)| v.parse::<i64>().ok())
        .ok_or_else(|| "No auth_date in initData".to_string())?;
    let now = chrono::Utc::now().timestamp();
    if now - auth_date > INIT_DATA_MAX_AGE_SECS {
        return Err("initData is expired".to_string());
    }

    let user_json = pairs
        .iter()
        .find(|(k, _)| k == "user")
        .map(|(_, v)| v.as_str())
        .ok_or_else(|| "No user in initData".to_string())?;

    serde_json::from_str(user_json).map_err(|e| format!("Malformed user JSON in initData: {}", e))
}
