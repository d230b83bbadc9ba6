use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitClaimRequest {
    pub patient_name: String,
    pub patient_age: String,
    pub claim_amount: String,
    #[serde(default)]
    pub claim_description: String,
    pub file_name: String,
    /// Base64-encoded document bytes
    pub file_content: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_request_uses_camel_case_and_optional_description() {
        let body = r#"{
            "patientName": "Jane Doe",
            "patientAge": "40",
            "claimAmount": "$500.00",
            "fileName": "claim.pdf",
            "fileContent": "JVBERi0="
        }"#;

        let request: SubmitClaimRequest = serde_json::from_str(body).unwrap();
        assert_eq!(request.patient_name, "Jane Doe");
        assert_eq!(request.claim_description, "");
        assert_eq!(request.file_name, "claim.pdf");
    }
}
