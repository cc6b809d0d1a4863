pub const REFINE_SYSTEM_PROMPT: &str = "You are an expert prompt engineer. \
You will rewrite the user's draft into ONE final, high-quality prompt. \
Output ONLY the final prompt text (no extra explanation). \
Keep code identifiers in English when appropriate. \
Make it specific, production-ready, and structured with clear sections and bullet points.";

pub fn refine_user_prompt(draft: &str) -> String {
    format!(
        "Rewrite this draft prompt so it is more complete, more precise and professional.\n\nDraft:\n\n{draft}"
    )
}
