//! Prompt construction for the classification and synthesis stages.
//!
//! Kept separate from the stage logic so prompt changes never touch
//! control flow, and so the formatting functions can be tested without a
//! model.

use crate::types::item::AspectTag;

/// System prompt for item labeling; built once per run and reused across
/// every batch call.
pub fn classify_system(product_name: &str) -> String {
    let aspects = aspect_list();
    format!(
        "You label public discussion items about the product \"{product_name}\".\n\
         For each item, return:\n\
         - sentiment: \"positive\", \"neutral\", or \"negative\" toward the product\n\
         - sentiment_score: 0 (hostile) to 100 (enthusiastic), 50 neutral\n\
         - aspects: which of [{aspects}] the item discusses (empty if none)\n\
         - relevant: false if the item does not actually discuss \"{product_name}\" \
         (same-named people, unrelated products, generic chatter)\n\
         Judge only what the item says. Do not infer sentiment from topic alone."
    )
}

/// User prompt for one item-label call.
pub fn classify_item(text: &str) -> String {
    format!("ITEM:\n{text}")
}

/// System prompt for report synthesis.
pub fn synthesis_system(product_name: &str) -> String {
    format!(
        "You write a short factual digest of aggregated user feedback about \
         \"{product_name}\".\n\
         You will receive an indexed list of classified feedback items and \
         precomputed scores.\n\
         Return:\n\
         - summary: an executive summary (2-4 sentences) of the overall reception\n\
         - strengths: 2-4 insights users praise, each with a specific title, a \
         one-paragraph description, and the indices of supporting items\n\
         - issues: 2-4 insights users complain about, in the same shape\n\
         - overall_score: echo the overall score you were given\n\
         Reference items only by index; never quote or invent item text. \
         Titles must name the concrete behavior, not a generic category."
    )
}

/// User prompt for one synthesis attempt.
pub fn synthesis_user(digest_json: &str, overall_score: u8, total_mentions: usize) -> String {
    format!(
        "OVERALL_SCORE: {overall_score}\n\
         TOTAL_MENTIONS: {total_mentions}\n\
         ITEMS_JSON:\n{digest_json}"
    )
}

/// Corrective block appended on a re-prompt, naming the specific
/// deficiencies of the previous attempt.
pub fn corrective_block(deficiencies: &[String]) -> String {
    let bullets = deficiencies
        .iter()
        .map(|d| format!("- {d}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "\n\nYour previous attempt was rejected for these reasons; fix every one:\n{bullets}"
    )
}

fn aspect_list() -> String {
    AspectTag::ALL
        .iter()
        .map(|a| format!("\"{}\"", a.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_system_names_every_aspect() {
        let system = classify_system("WidgetPro");
        for aspect in AspectTag::ALL {
            assert!(system.contains(aspect.label()), "missing {aspect}");
        }
        assert!(system.contains("WidgetPro"));
    }

    #[test]
    fn corrective_block_lists_deficiencies() {
        let block = corrective_block(&[
            "summary shorter than 20 characters".to_string(),
            "titles too generic".to_string(),
        ]);
        assert!(block.contains("- summary shorter than 20 characters"));
        assert!(block.contains("- titles too generic"));
    }
}
