// src/services/plan_parser.rs
use crate::errors::StagingError;
use crate::models::DesignPlan;
use serde::Deserialize;

/// Planning responses arrive in one of two supported shapes. Which one the
/// deployed model emits is fixed by configuration; the strategies are not
/// probed in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    /// A JSON object (possibly fenced or surrounded by prose) with a
    /// `designs` array.
    Json,
    /// Plain text with paired `[TITLE]`/`[DESCRIPTION]` markers per design.
    Tagged,
}

#[derive(Deserialize)]
struct PlanDocument {
    designs: Vec<DesignPlan>,
}

/// Parses the planning response into exactly `expected` design plans, in
/// source order. Anything else is a `PlanParse` failure and aborts the
/// whole generation; proceeding with a partial plan set would leave the
/// caller with designs it cannot render.
pub fn parse_plans(
    text: &str,
    format: PlanFormat,
    expected: usize,
) -> Result<Vec<DesignPlan>, StagingError> {
    let plans = match format {
        PlanFormat::Json => parse_json(text)?,
        PlanFormat::Tagged => parse_tagged(text)?,
    };

    if plans.len() != expected {
        return Err(StagingError::PlanParse(format!(
            "Expected {} design concepts, found {}",
            expected,
            plans.len()
        )));
    }
    Ok(plans)
}

/// Models wrap JSON in markdown fences or prose; the first `{` and last
/// `}` bound the object regardless.
fn parse_json(text: &str) -> Result<Vec<DesignPlan>, StagingError> {
    let start = text
        .find('{')
        .ok_or_else(|| StagingError::PlanParse("No JSON object in response".to_string()))?;
    let end = text
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| StagingError::PlanParse("No JSON object in response".to_string()))?;

    let doc: PlanDocument = serde_json::from_str(&text[start..=end])
        .map_err(|e| StagingError::PlanParse(format!("Malformed design JSON: {}", e)))?;

    Ok(doc.designs)
}

fn extract_between<'a>(
    text: &'a str,
    from: usize,
    open: &str,
    close: &str,
) -> Option<(&'a str, usize)> {
    let start = text[from..].find(open)? + from + open.len();
    let end = text[start..].find(close)? + start;
    Some((text[start..end].trim(), end + close.len()))
}

fn parse_tagged(text: &str) -> Result<Vec<DesignPlan>, StagingError> {
    let mut plans = Vec::new();
    let mut cursor = 0;

    while let Some((title, after_title)) = extract_between(text, cursor, "[TITLE]", "[/TITLE]") {
        let (description, after_desc) =
            extract_between(text, after_title, "[DESCRIPTION]", "[/DESCRIPTION]").ok_or_else(
                || {
                    StagingError::PlanParse(format!(
                        "Design \"{}\" has no description block",
                        title
                    ))
                },
            )?;

        plans.push(DesignPlan {
            title: title.to_string(),
            description: description.to_string(),
            image_prompt: None,
        });
        cursor = after_desc;
    }

    if plans.is_empty() {
        return Err(StagingError::PlanParse(
            "No title/description markers in response".to_string(),
        ));
    }
    Ok(plans)
}
