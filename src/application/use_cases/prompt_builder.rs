use crate::domain::endpoint::EndpointDescription;
use serde_json::Value;

pub const DEFAULT_MIN_TEST_CASES: usize = 10;

/// Status the script prompt asks the valid-request scenario to assert.
const SCRIPT_EXPECTED_STATUS: u16 = 200;

const REALISTIC_VALUES: &str = "Each test case should include realistic and practical data values for fields like email addresses, names, phone numbers, and other commonly used fields in APIs. Avoid placeholder terms like \"example\" or \"test\". Use realistic examples such as:
- Email: \"john.doe@yahoo.com\", \"rasel@gmail.com\"
- Name: \"John Doe\", \"Jane O'Connor\", \"Dr. Emily Watson\"
- Passwords: \"StrongPass123!\", \"WeakPassword\", \"abc\"
- Special Characters: \"John@Doe!\", \"Company_Name#42\"
- Numbers: \"12345\", \"9999999999\", \"-10\"
";

const TEST_CASE_SHAPE: &str = "Return a strictly valid JSON array of test cases, where each test case follows this structure:
[
  {
    \"description\": \"Test case description\",
    \"payload\": {},
    \"expected_status\": 200,
    \"test_type\": \"positive|negative|boundary\"
  }
]
";

const TEST_SCENARIOS: [&str; 7] = [
    "Valid data (positive)",
    "Missing required fields (negative)",
    "Invalid data types (negative)",
    "Boundary values for fields (boundary, e.g. maximum lengths, special characters, or empty strings)",
    "Realistic special characters in strings (negative)",
    "Empty/null values (negative)",
    "Large data payloads (boundary, e.g. long names or emails)",
];

const SCRIPT_SCENARIOS: [&str; 9] = [
    "Valid Request: test the API with valid input and ensure the status code is {expected}.",
    "Invalid Method: call the API with an unsupported HTTP method and check the response is handled correctly (e.g. 405 Method Not Allowed).",
    "Missing Parameters: send missing or incomplete parameters and check for the appropriate error (e.g. 400 Bad Request).",
    "Boundary Testing: use edge-case values such as very large inputs, very small inputs, or values at the limit of what the API accepts.",
    "Authentication: if authentication is required, test with both valid and invalid credentials.",
    "Rate Limiting: send many consecutive requests and check the API answers with the appropriate status (e.g. 429 Too Many Requests).",
    "Load Testing: simulate a high number of concurrent requests and watch for timeouts or slow responses.",
    "Response Validation: verify the response body format and data, including content type and headers.",
    "Security: check for SQL injection, cross-site scripting (XSS) and improper authorization handling.",
];

/// Prompt asking for at least `min_cases` test cases as a bare JSON array.
pub fn build_test_case_prompt(endpoint: &EndpointDescription, min_cases: usize) -> String {
    let mut body = String::new();
    body.push_str(
        "Generate test cases in JSON format for the following API request. Include positive, negative, and boundary test cases.\n\n",
    );

    body.push_str("API Details:\n");
    body.push_str(&format!("- HTTP Method: {}\n", endpoint.http_method));
    body.push_str(&format!("- Endpoint: {}\n", endpoint.api_url));
    body.push_str(&format!("- Headers: {}\n", render_optional(&endpoint.headers)));
    body.push_str(&format!(
        "- Parameters: {}\n",
        render_optional(&endpoint.parameters)
    ));
    body.push_str(&format!(
        "- Sample Payload: {}\n\n",
        sample_payload(endpoint)
    ));

    body.push_str(REALISTIC_VALUES);
    body.push('\n');
    body.push_str(TEST_CASE_SHAPE);

    body.push_str("\nFocus on these common scenarios:\n");
    for (index, scenario) in TEST_SCENARIOS.iter().enumerate() {
        body.push_str(&format!("{}. {}\n", index + 1, scenario));
    }

    body.push_str(&format!(
        "\nEnsure all examples are real-world applicable. Only return the JSON array. Do not include any additional text or explanation in the response. Give at least {} test cases.\n",
        min_cases.max(1)
    ));
    body
}

/// Prompt asking for a runnable test script in `language` / `framework`.
pub fn build_script_prompt(endpoint: &EndpointDescription, language: &str, framework: &str) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        "Generate a comprehensive API test script in {} using {} to simulate real-world testing scenarios.\n",
        language, framework
    ));
    body.push_str("The script should test the API with various conditions and provide a report with the results.\n\n");

    body.push_str("API Details:\n");
    body.push_str(&format!("- Name: {}\n", endpoint.api_name));
    body.push_str(&format!("- URL: {}\n", endpoint.api_url));
    body.push_str(&format!("- HTTP Method: {}\n", endpoint.http_method));
    body.push_str(&format!("- Headers: {}\n", render_optional(&endpoint.headers)));
    body.push_str(&format!("- Payload: {}\n", sample_payload(endpoint)));
    body.push_str(&format!("- Expected Status Code: {}\n", SCRIPT_EXPECTED_STATUS));
    body.push_str(&format!("- Auth: {}\n\n", auth_hint(endpoint)));

    body.push_str("Key Testing Scenarios:\n");
    for (index, scenario) in SCRIPT_SCENARIOS.iter().enumerate() {
        let scenario = scenario.replace("{expected}", &SCRIPT_EXPECTED_STATUS.to_string());
        body.push_str(&format!("{}. {}\n", index + 1, scenario));
    }

    body.push_str("\nEnsure the script is modular, reusable, and easy to understand. It should also include appropriate assertions and logs for validation.\n\n");
    body.push_str(&format!(
        "Please provide only the code in response, formatted as per {} standards.\n",
        framework
    ));
    body
}

fn render_optional<T: serde::Serialize>(value: &Option<T>) -> String {
    value
        .as_ref()
        .and_then(|inner| serde_json::to_string(inner).ok())
        .unwrap_or_else(|| "None".to_string())
}

fn sample_payload(endpoint: &EndpointDescription) -> String {
    let payload = endpoint
        .payload
        .clone()
        .map(Value::Object)
        .unwrap_or(Value::Null);
    serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "null".to_string())
}

fn auth_hint(endpoint: &EndpointDescription) -> &'static str {
    let has_auth_header = endpoint
        .headers
        .iter()
        .flatten()
        .any(|(name, _)| name.eq_ignore_ascii_case("authorization"));
    if has_auth_header {
        "Authorization header supplied"
    } else {
        "None"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::endpoint::HttpMethod;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn signup() -> EndpointDescription {
        let mut endpoint = EndpointDescription::new(
            "Signup",
            "https://api.example.com/signup",
            HttpMethod::Post,
            "user-1",
        );
        let mut payload = serde_json::Map::new();
        payload.insert("email".to_string(), json!("jane@example.com"));
        endpoint.payload = Some(payload);
        endpoint
    }

    #[test]
    fn test_case_prompt_embeds_endpoint_and_contract() {
        let prompt = build_test_case_prompt(&signup(), 12);
        assert!(prompt.contains("- HTTP Method: POST"));
        assert!(prompt.contains("- Endpoint: https://api.example.com/signup"));
        assert!(prompt.contains("\"email\": \"jane@example.com\""));
        assert!(prompt.contains("\"expected_status\""));
        assert!(prompt.contains("7. Large data payloads"));
        assert!(prompt.contains("at least 12 test cases"));
    }

    #[test]
    fn test_case_prompt_without_optional_sections() {
        let endpoint = EndpointDescription::new(
            "Health",
            "https://api.example.com/health",
            HttpMethod::Get,
            "user-1",
        );
        let prompt = build_test_case_prompt(&endpoint, DEFAULT_MIN_TEST_CASES);
        assert!(prompt.contains("- Headers: None"));
        assert!(prompt.contains("- Sample Payload: null"));
        assert!(prompt.contains("at least 10 test cases"));
    }

    #[test]
    fn test_script_prompt_lists_nine_scenarios() {
        let mut endpoint = signup();
        let mut headers = BTreeMap::new();
        headers.insert("Authorization".to_string(), "Bearer t".to_string());
        endpoint.headers = Some(headers);

        let prompt = build_script_prompt(&endpoint, "javascript", "jest");
        assert!(prompt.contains("in javascript using jest"));
        assert!(prompt.contains("ensure the status code is 200"));
        assert!(prompt.contains("9. Security"));
        assert!(prompt.contains("- Auth: Authorization header supplied"));
        assert!(prompt.ends_with("formatted as per jest standards.\n"));
    }
}
