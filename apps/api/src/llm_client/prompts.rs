// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it; this file holds the cross-cutting pieces.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Builds a system prompt from a role description plus the JSON-only rules.
pub fn json_system(role: &str) -> String {
    format!("{role} {JSON_ONLY_SYSTEM}")
}

/// Fills `{name}` placeholders in a template in a single pass, so text that
/// is substituted in is never scanned for placeholders. Unknown placeholders
/// are left as-is.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let hit = after.find('}').and_then(|end| {
            let key = &after[..end];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (end, *value))
        });
        match hit {
            Some((end, value)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
