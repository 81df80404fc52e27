//! Parsing of the image planner's fenced JSON plan.

use crate::content::last_json_fence;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One planned image generation, tied to a paragraph of the draft.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePlan {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<u32>,
}

/// The parsed plan: a prose summary (text before the first fence) plus the
/// structured plans and optional paragraph bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePlanParse {
    #[serde(default)]
    pub summary: String,
    pub plans: Vec<ImagePlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_image_bindings: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FencedPlan {
    #[serde(default, alias = "imagePlans")]
    plans: Vec<ImagePlan>,
    #[serde(default)]
    paragraph_image_bindings: Option<Value>,
}

/// Parse the last fenced JSON block of the planner's message content. The
/// block is either a bare array of plans or an object wrapping them; plans
/// without a prompt are discarded. Returns `None` when nothing usable is
/// found.
pub fn parse_image_plan(text: &str) -> Option<ImagePlanParse> {
    let fence = last_json_fence(text)?;
    let value: Value = serde_json::from_str(fence).ok()?;

    let (plans, bindings) = match value {
        Value::Array(_) => (serde_json::from_value::<Vec<ImagePlan>>(value).ok()?, None),
        Value::Object(_) => {
            let wrapped: FencedPlan = serde_json::from_value(value).ok()?;
            (wrapped.plans, wrapped.paragraph_image_bindings)
        }
        _ => return None,
    };

    let plans: Vec<ImagePlan> = plans
        .into_iter()
        .filter(|plan| !plan.prompt.trim().is_empty())
        .collect();
    if plans.is_empty() {
        return None;
    }

    let summary = text
        .split("```")
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    Some(ImagePlanParse {
        summary,
        plans,
        paragraph_image_bindings: bindings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_array() {
        let text = "配图计划如下\n```json\n[{\"prompt\": \"sunset over harbor\"}, {\"prompt\": \"\"}]\n```";
        let parsed = parse_image_plan(text).unwrap();
        assert_eq!(parsed.summary, "配图计划如下");
        assert_eq!(parsed.plans.len(), 1);
        assert_eq!(parsed.plans[0].prompt, "sunset over harbor");
    }

    #[test]
    fn test_parse_wrapped_object_with_bindings() {
        let text = "```json\n{\"imagePlans\": [{\"prompt\": \"a\", \"paragraphIndex\": 2}], \"paragraphImageBindings\": {\"2\": 0}}\n```";
        let parsed = parse_image_plan(text).unwrap();
        assert_eq!(parsed.plans[0].paragraph_index, Some(2));
        assert!(parsed.paragraph_image_bindings.is_some());
    }

    #[test]
    fn test_no_fence_is_none() {
        assert!(parse_image_plan("no code fence here").is_none());
    }

    #[test]
    fn test_all_plans_without_prompt_is_none() {
        let text = "```json\n[{\"description\": \"x\"}]\n```";
        assert!(parse_image_plan(text).is_none());
    }
}
