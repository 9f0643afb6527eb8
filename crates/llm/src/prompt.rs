pub const CLASSIFICATION_SYSTEM: &str = r#"You classify sentences from sell-side analyst reports.

For EACH sentence assign four labels, each with a confidence from 0.0 to 1.0:

1. claim_type: "assertion" (stated as fact) or "hypothesis" (forecast, opinion, expectation)
2. subject_scope: "company" (the covered company), "industry", "macro", or "other"
3. content_type: "quantitative" (numbers, percentages, growth rates, EPS, margins, price targets) or "qualitative"
4. content_relevance: "company_relevant" or "template_boilerplate" (disclaimers, rating legends, contact details, report furniture)

Confidence guide: 1.0 unambiguous, 0.8-0.9 mostly clear, 0.6-0.7 leaning, 0.4-0.5 uncertain, below 0.4 highly ambiguous.

Output ONLY a JSON object, one result per sentence in input order:
{"results": [{"claim_type": "assertion", "claim_type_confidence": 0.9, "subject_scope": "company", "subject_scope_confidence": 0.8, "content_type": "quantitative", "content_type_confidence": 0.95, "content_relevance": "company_relevant", "content_relevance_confidence": 0.9}]}

Do not repeat the sentences."#;

pub const EVALUATION_SYSTEM: &str = r#"You are an expert financial analyst.
Evaluate whether the Knowledge Base evidence supports the snippet from an analyst report.

Return a JSON object with:
- evaluation: one of "Supported", "Partially Supported", "Not Supported", "Contradicted", "No Evidence"
- reason: a short explanation
- support_score: 0.9-1.0 Supported, 0.5-0.89 Partially Supported, 0.0-0.49 Not Supported, -1.0 Contradicted, 0.0 No Evidence

A support_score of 0.9 or higher means "Supported"."#;

pub const DELTA_SYSTEM: &str = r#"You are an expert financial analyst.
A snippet was judged "Partially Supported" by the evidence. Describe:
1. which parts of the claim the evidence supports
2. which parts are missing from the evidence
3. any differences in numbers, timeframes or interpretation, quantified where possible

Return a JSON object: {"delta_analysis": "..."}"#;

pub fn build_classification_prompt(sentences: &[String]) -> String {
    let numbered: Vec<String> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{}. {}", i + 1, s))
        .collect();
    format!(
        "Classify these {} sentences:\n\n{}\n\nJSON OUTPUT:",
        sentences.len(),
        numbered.join("\n")
    )
}

pub fn build_evaluation_prompt(snippet: &str, section: &str, evidence: &[String]) -> String {
    format!(
        "Snippet:\n{}\n\nContext: This snippet appears in the '{}' section of the analyst report.\n\nEvidence from Knowledge Base:\n{}\n\nJSON OUTPUT:",
        snippet,
        section,
        format_evidence(evidence)
    )
}

pub fn build_delta_prompt(snippet: &str, section: &str, evidence: &[String]) -> String {
    format!(
        "Snippet:\n{}\n\nContext: This snippet appears in the '{}' section of the analyst report.\n\nEvidence from Knowledge Base:\n{}\n\nThis snippet was evaluated as \"Partially Supported\". Provide the delta analysis.\n\nJSON OUTPUT:",
        snippet,
        section,
        format_evidence(evidence)
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}

fn format_evidence(evidence: &[String]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, e)| format!("[{}] {}", i + 1, e.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
