//! Instruction templates and canonical generation input.
//!
//! Instructions are constant per mode; nothing from the request body is
//! interpolated into them. Request data travels only in the JSON input.

use crate::models::{AnalysisRequest, Mode};
use crate::services::providers::GenerationRequest;
use serde::Serialize;
use serde_json::Value;

const ROLE: &str = "You are a physician-guided, evidence-based brain health coach.";

const GROUND_RULES: &str = "\
You MUST:
- Anchor your analysis to the user's BTA results provided in bta_payload and treat them as ground truth.
- Never invent user data. If something is not in bta_payload, state explicitly that it is not provided.
- Use web search before finalizing your answer to retrieve up-to-date evidence, clinical guidelines, risk associations and intervention evidence relevant to these results.
- Keep output clinically professional, structured and actionable.";

const SECTION_DEEP_DIVE_FORMAT: &str = "\
Report type: section deep dive.
- Start by naming the section identified by section_id.
- Analyse that one section in depth: what the results show, what drives the risk, and evidence-based interventions.
- Then briefly note interactions with the other highest-risk sections in bta_payload.";

const FULL_REPORT_FORMAT: &str = "\
Report type: full report.
- Start with a comprehensive executive summary.
- Then give a section-by-section breakdown of every section in bta_payload.
- Finish with a phased action plan (immediate, next 3 months, longer term).";

const EVIDENCE_NOTES: &str = "\
End with an \"Evidence Notes\" section that summarizes what your web searches found, with citations or attribution for each source.";

/// Instruction text for `mode`. Deterministic: same mode, same text.
pub fn instructions(mode: Mode) -> String {
    let format = match mode {
        Mode::SectionDeepDive => SECTION_DEEP_DIVE_FORMAT,
        Mode::FullReport => FULL_REPORT_FORMAT,
    };

    [ROLE, GROUND_RULES, format, EVIDENCE_NOTES].join("\n\n")
}

#[derive(Serialize)]
struct CanonicalInput<'a> {
    mode: Mode,
    section_id: Option<&'a str>,
    bta_payload: &'a Value,
}

/// Pair the mode's instructions with the canonical JSON input
/// `{mode, section_id, bta_payload}`.
pub fn build_generation_request(
    request: &AnalysisRequest,
) -> Result<GenerationRequest, serde_json::Error> {
    let input = serde_json::to_string(&CanonicalInput {
        mode: request.mode,
        section_id: request.section_id.as_deref(),
        bta_payload: &request.bta_payload,
    })?;

    Ok(GenerationRequest {
        instructions: instructions(request.mode),
        input,
    })
}
