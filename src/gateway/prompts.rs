//! Fixed instruction text sent alongside the photo.

use crate::assessment::Language;

pub(crate) fn analysis_prompt(language: Language) -> String {
    format!(
        r#"You are an experienced hair-restoration surgeon reviewing a patient's scalp photo.

Assess the photo and return JSON that matches the provided schema:
- norwoodScale: the Norwood stage of male pattern hair loss, an integer from 1 to 7.
- totalGrafts: the estimated number of follicular unit grafts needed for a natural restoration.
- distribution: the grafts split by zone (for example "Frontal hairline", "Mid-scalp", "Crown"), counts summing to totalGrafts.
- estimatedCostMin / estimatedCostMax: a realistic cost range in US dollars for the procedure, min not above max.
- summary: two or three sentences for the patient describing the findings.

Write the summary in {language}. Keep every other field language-neutral.
If the photo does not show a scalp, still answer with your best estimate and say so in the summary."#,
        language = language.display_name()
    )
}

pub(crate) fn preview_prompt(style: &str) -> String {
    format!(
        r#"Edit this photo to show a realistic result twelve months after a successful hair transplant.

Desired hair style: {style}

Rules:
- Keep the person's face, skin tone, expression, lighting, background and camera angle unchanged.
- Only change the hair: restore density along the hairline and thinning areas to match the style.
- The result must look like an unretouched photograph.
- Return the edited image."#,
        style = style.trim()
    )
}
