//! Built-in instructions and starter prompts.

/// Substring in a critique that ends the loop.
pub const APPROVAL_SENTINEL: &str = "<OK>";

/// Appended to the caller's generation instructions.
pub const BASE_GENERATION_SYSTEM_PROMPT: &str = "\
You are an expert content creator. Produce high-quality, engaging content for the user's request.

1. Content:
   - Clear, well-structured writing with a logical flow
   - Relevant examples and details
   - Consistent style and tone

2. Quality:
   - Correct grammar and language
   - Original, accurate and complete

3. Format:
   - Open with a clear introduction
   - Organize the body in logical sections
   - Close with a strong conclusion

4. Revisions:
   - When you receive a critique, address every point
   - Keep the original intent while improving quality
   - Return the full revised content, not a diff

Stay focused on the user's request and be ready to improve based on feedback.";

/// Appended to the caller's reflection instructions.
pub const BASE_REFLECTION_SYSTEM_PROMPT: &str = "\
You are an expert content reviewer and editor. Analyze the content you are given and provide detailed, constructive feedback.

1. Content analysis: clarity, coherence, logical flow, completeness, missing elements.
2. Quality assessment: grammar, consistency of style and tone, engagement, originality.
3. Improvement suggestions: specific, actionable recommendations with concrete examples;
   point out what needs expansion, clarification or restructuring.
4. Final verdict:
   - If the content meets every quality standard and needs no further changes, respond with: <OK>
   - Otherwise, give a numbered list of specific recommendations

Structure your answer as: overall assessment, detailed feedback, then either the recommendations or <OK>.";

/// System instruction for the prompt optimizer.
pub const OPTIMIZATION_SYSTEM_PROMPT: &str = "\
You are a prompt optimization expert. Rewrite the user's prompt so it is more detailed, specific and better suited to producing high-quality content.

1. Keep the original intent
2. Add relevant details and specifications
3. Improve clarity and structure
4. Consider adding formatting suggestions
5. Remove vague or ambiguous language

Respond ONLY with the optimized prompt, without explanations or additional text.";

/// Wraps the raw user prompt for the optimizer.
pub fn optimization_request(user_prompt: &str) -> String {
    format!("Please optimize this prompt for better results: {user_prompt}")
}

/// Join caller instructions with a built-in base prompt.
pub fn compose_system_prompt(custom: &str, base: &str) -> String {
    let custom = custom.trim();
    if custom.is_empty() {
        base.to_string()
    } else {
        format!("{custom}\n\n{base}")
    }
}

/// A named starter prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub prompt: &'static str,
}

pub const TEMPLATES: &[Template] = &[
    Template {
        name: "Algorithm Design",
        prompt: "Design a simple algorithm to find the longest palindrome in a string.",
    },
    Template {
        name: "Essay Outline",
        prompt: "Create an outline for an essay about the impact of artificial intelligence on modern education.",
    },
    Template {
        name: "Marketing Copy",
        prompt: "Write marketing copy for a new fitness app that helps users track their workouts and nutrition.",
    },
    Template {
        name: "Story Idea",
        prompt: "Develop a short story idea about a time traveler who accidentally changes history.",
    },
    Template {
        name: "Product Description",
        prompt: "Write a product description for a smart home device that controls all appliances via voice commands.",
    },
];

/// Look up a template by name, ignoring case and treating `-`/`_` as spaces.
pub fn find_template(name: &str) -> Option<&'static Template> {
    let wanted = normalize(name);
    TEMPLATES.iter().find(|t| normalize(t.name) == wanted)
}

fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c == '-' || c == '_' { ' ' } else { c.to_ascii_lowercase() })
        .collect()
}
