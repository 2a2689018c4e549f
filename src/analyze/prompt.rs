// src/analyze/prompt.rs
use crate::profile::UserProfile;

/// Prompt for one page: the serialized profile, the page text, and the expected answer shape.
pub fn build_prompt(profile: &UserProfile, text: &str) -> String {
    let profile_json = serde_json::to_string_pretty(profile).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"Analyze the following text based on the user's profile and identify relevant news, opportunities, and threats.

User Profile:
{profile_json}

Text to Analyze:
{text}

Provide the analysis in a valid JSON format, with the following structure:
```json
{{
    "news": [],
    "opportunities": [],
    "threats": []
}}
```
Each entry should be an object with at least a "title" and a "summary" field.
"#
    )
}
