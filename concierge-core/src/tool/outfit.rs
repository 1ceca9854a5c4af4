use async_trait::async_trait;
use serde_json::{Value, json};

use crate::{
    error::ToolError,
    model::{OutfitCategory, OutfitSuggestion},
    tool::{Tool, ToolId},
};

/// Clothing recommendation for a temperature in Celsius. Always succeeds.
pub fn suggest_outfit(temp_c: f64) -> OutfitSuggestion {
    OutfitCategory::for_temperature(temp_c).into()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutfitTool;

#[async_trait]
impl Tool for OutfitTool {
    fn id(&self) -> ToolId {
        ToolId::SuggestOutfit
    }

    fn description(&self) -> &'static str {
        "Suggest clothing for a temperature in degrees Celsius. \
         Call get_weather first to obtain the temperature."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "temp_c": { "type": "number", "description": "Temperature in degrees Celsius" }
            },
            "required": ["temp_c"]
        })
    }

    async fn call(&self, args: &Value) -> Result<Value, ToolError> {
        let temp_c = args
            .get("temp_c")
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolError::InvalidArguments {
                tool: self.id().as_str(),
                message: "missing numeric 'temp_c'".to_string(),
            })?;

        Ok(json!(suggest_outfit(temp_c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(t: f64) -> OutfitCategory {
        OutfitCategory::for_temperature(t)
    }

    #[test]
    fn boundaries_belong_to_upper_band() {
        assert_eq!(category(9.99), OutfitCategory::WinterWear);
        assert_eq!(category(10.0), OutfitCategory::LightJacket);
        assert_eq!(category(17.99), OutfitCategory::LightJacket);
        assert_eq!(category(18.0), OutfitCategory::LongSleeves);
        assert_eq!(category(23.99), OutfitCategory::LongSleeves);
        assert_eq!(category(24.0), OutfitCategory::ShortSleeves);
    }

    #[test]
    fn extremes_map_to_outer_bands() {
        assert_eq!(category(-40.0), OutfitCategory::WinterWear);
        assert_eq!(category(f64::NEG_INFINITY), OutfitCategory::WinterWear);
        assert_eq!(category(45.0), OutfitCategory::ShortSleeves);
        assert_eq!(category(f64::INFINITY), OutfitCategory::ShortSleeves);
    }

    #[test]
    fn mapping_is_monotonic() {
        let mut previous = category(-30.0);
        let mut t = -30.0;
        while t <= 40.0 {
            let current = category(t);
            assert!(current >= previous, "non-monotonic at {t}");
            previous = current;
            t += 0.25;
        }
    }

    #[test]
    fn suggestion_text_is_one_of_four() {
        let texts: Vec<&str> = OutfitCategory::all().iter().map(|c| c.as_str()).collect();
        for t in [-5.0, 12.0, 20.0, 30.0] {
            let s = suggest_outfit(t);
            assert_eq!(s.status, "success");
            assert!(texts.contains(&s.suggestion.as_str()));
        }
        assert_eq!(suggest_outfit(9.99).suggestion, "Coat and winter gear");
        assert_eq!(suggest_outfit(10.0).suggestion, "Light jacket");
    }

    #[tokio::test]
    async fn tool_call_reads_temp_c() {
        let value = OutfitTool.call(&json!({ "temp_c": 25 })).await.unwrap();
        assert_eq!(value["suggestion"], "Short sleeves and light clothing");

        let err = OutfitTool.call(&json!({ "temp": 25 })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { tool: "suggest_outfit", .. }));
    }
}
