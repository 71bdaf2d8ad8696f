//! Prompt templates for the translator engine (spec.md §4.2).
//!
//! The Chinese stylistic directives and context labels are grounded
//! bit-for-bit on `original_source/local/translator/models/prompts.py`'s
//! `PromptBuilder`. These are data, not code (spec.md §9): kept as plain
//! template functions rather than parameterized by anything beyond the
//! text they carry.

/// The three stylistic directives shared by every prompt variant: drop
/// source syntax ("forgetting"), write as a native author would
/// ("rebirth"), and pursue natural rhythm over literal wording
/// ("idiomaticity").
fn base_principles() -> &'static str {
    "【遗忘之律】忘记英文的句法。忘记英文的语序。只记住它要说的事。\n\
     【重生之律】如果你是中国作者，面对中国读者，你会怎么讲这个故事？\n\
     【地道之律】追求地道的表达，而非字面翻译。中文有自己的韵律和节奏感。"
}

/// Single-shot prompt with no surrounding context.
pub fn build_simple_prompt(text: &str) -> String {
    format!(
        "你是专业的中文母语翻译者。\n\n\
         ## 翻译原则\n{principles}\n\n\
         ## 翻译规则\n\
         1. 只输出翻译内容，不要添加任何解释或额外说明\n\
         2. 确保翻译流畅自然，符合中文表达习惯\n\
         3. 如果是口语化内容，保持口语化风格\n\n\
         ---\n\n\
         【原文】\n{text}\n\n\
         请直接输出中文翻译，不要添加任何标记或解释。",
        principles = base_principles(),
    )
}

/// Sliding-window prompt (no summary block), used by the no-summary
/// fallback mode and reused by the legacy full-context path for its
/// long-text guard.
pub fn build_context_prompt(text: &str, context_before: &str, context_after: &str) -> String {
    if context_before.is_empty() && context_after.is_empty() {
        return build_simple_prompt(text);
    }

    let mut prompt = format!(
        "你是专业的中文母语翻译者。\n\n\
         ## 翻译原则\n{principles}\n\
         【真实之锚】数据一字不改，事实纹丝不动，逻辑完整移植，术语规范标注。\n\n\
         ## 翻译规则\n\
         1. 只输出翻译内容，不要添加任何解释或额外说明\n\
         2. 结合上下文理解代词、指代关系\n\
         3. 保持术语翻译的一致性\n\
         4. 确保翻译流畅自然，符合中文表达习惯\n\
         5. 如果是口语化内容，保持口语化风格\n\
         6. 让读者感觉“写得真好”，而非“翻译得真好”\n\n\
         ---\n\n",
        principles = base_principles(),
    );
    if !context_before.is_empty() {
        prompt.push_str(&format!("【前文】{context_before}\n\n"));
    }
    prompt.push_str(&format!("【当前文本】{text}\n\n"));
    if !context_after.is_empty() {
        prompt.push_str(&format!("【后文】{context_after}\n\n"));
    }
    prompt.push_str("请直接输出【当前文本】的中文翻译，不要翻译上下文部分，不要添加任何标记或解释。");
    prompt
}

/// Legacy full-context prompt: the entire source text is carried as
/// background alongside the single segment to translate. Used only when
/// the full text is short enough to avoid prompt bloat (spec.md §4.2's
/// long-text guard switches to [`build_context_prompt`] above 5000 chars).
pub fn build_full_context_prompt(text: &str, full_text: &str) -> String {
    format!(
        "你是专业的中文母语翻译者。请将以下文本片段翻译成中文。\n\n\
         ## 翻译原则\n{principles}\n\n\
         ## 任务\n\
         1. 阅读完整原文只是为了理解语境和术语\n\
         2. **只翻译“当前片段”这一句话**\n\
         3. 结合完整原文的语境，准确理解代词、指代关系\n\
         4. 保持术语翻译的一致性\n\n\
         ## 输出要求\n\
         - **只输出当前片段的中文翻译**\n\
         - **不要翻译完整原文**\n\
         - **不要添加任何标记、解释或额外内容**\n\
         - **必须输出翻译结果，不能为空**\n\n\
         ---\n\n\
         【完整原文】（仅作背景参考，不要翻译）\n{full_text}\n\n\
         ---\n\n\
         【当前片段】（只翻译这一句话）\n{text}\n\n\
         ---\n\n\
         请直接输出【当前片段】的中文翻译：",
        principles = base_principles(),
    )
}

/// Reflection prompt: asks the model to revise its own initial draft
/// toward more idiomatic Chinese, or to return it unchanged if already
/// good (spec.md §4.2 mode 1's two-call protocol).
pub fn build_reflection_prompt(text: &str, initial_translation: &str) -> String {
    format!(
        "你是专业的中文母语翻译者，需要优化以下翻译。\n\n\
         ## 优化原则\n\
         【地道之律】追求地道的表达，而非字面翻译。中文有自己的韵律和节奏感。\n\
         【重生之律】如果你是中国作者，面对中国读者，你会怎么讲这个故事？\n\
         【检验标准】让读者感觉“写得真好”，而非“翻译得真好”。\n\n\
         ---\n\n\
         【原文】\n{text}\n\n\
         【初步翻译】\n{initial_translation}\n\n\
         请评估翻译质量，如果发现可以改进的地方（如：不够地道、有翻译腔、不符合中文表达习惯），\
         请直接输出优化后的翻译。如果翻译已经很好，请直接输出原译文。\n\n\
         只输出最终的中文翻译，不要添加任何评价、解释或标记。"
    )
}

/// Summary prompt: a ≤150-character Chinese synopsis of the full text,
/// used as the "文章背景" block in the summary+window mode.
pub fn build_summary_prompt(full_text: &str) -> String {
    format!(
        "请阅读以下英文文章，并提供一个简洁的总结（150字以内），包括：\n\
         1. 文章主题和核心内容\n\
         2. 关键人物、地点、事件\n\
         3. 重要的专有名词和术语（保留英文原词）\n\n\
         请用中文输出总结，简明扼要即可。\n\n\
         ---\n\n\
         【完整原文】\n{full_text}\n\n\
         ---\n\n\
         请直接输出总结："
    )
}

/// Summary + sliding-window prompt: the preferred long-text strategy,
/// combining the one-shot summary with per-segment pre/post context.
pub fn build_sliding_window_prompt(text: &str, summary: &str, context_before: &str, context_after: &str) -> String {
    let mut prompt = format!(
        "你是专业的中文母语翻译者。\n\n\
         ## 翻译原则\n{principles}\n\n\
         ## 文章背景\n{summary}\n\n\
         ## 翻译任务\n\
         请翻译【当前文本】，结合文章背景和上下文，确保：\n\
         1. 只输出【当前文本】的中文翻译\n\
         2. 术语翻译与全文保持一致\n\
         3. 准确理解代词和指代关系\n\
         4. 保持口语化风格（如果是对话）\n\
         5. 不要添加任何标记或解释\n\n\
         ---\n",
        principles = base_principles(),
    );

    if !context_before.is_empty() {
        prompt.push_str(&format!("\n【前文参考】（不要翻译）\n{context_before}\n"));
    }
    prompt.push_str(&format!("\n【当前文本】（只翻译这部分）\n{text}\n"));
    if !context_after.is_empty() {
        prompt.push_str(&format!("\n【后文参考】（不要翻译）\n{context_after}\n"));
    }
    prompt.push_str("\n---\n\n请直接输出【当前文本】的中文翻译：");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prompt_falls_back_to_simple_without_context() {
        let simple = build_simple_prompt("hello");
        let context = build_context_prompt("hello", "", "");
        assert_eq!(simple, context);
    }

    #[test]
    fn context_prompt_labels_pre_and_post_context_distinctly() {
        let prompt = build_context_prompt("focus", "before", "after");
        assert!(prompt.contains("【前文】before"));
        assert!(prompt.contains("【当前文本】focus"));
        assert!(prompt.contains("【后文】after"));
    }

    #[test]
    fn sliding_window_prompt_carries_summary_and_context_labels() {
        let prompt = build_sliding_window_prompt("focus", "synopsis", "before", "after");
        assert!(prompt.contains("## 文章背景\nsynopsis"));
        assert!(prompt.contains("【前文参考】"));
        assert!(prompt.contains("【当前文本】"));
        assert!(prompt.contains("【后文参考】"));
    }

    #[test]
    fn full_context_prompt_delimits_full_text_from_focus_segment() {
        let prompt = build_full_context_prompt("focus", "the whole article");
        assert!(prompt.contains("【完整原文】"));
        assert!(prompt.contains("the whole article"));
        assert!(prompt.contains("【当前片段】"));
        assert!(prompt.contains("focus"));
    }
}
