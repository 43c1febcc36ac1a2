//! The five-step generation prompt.
//!
//! The prompt is the upstream half of the parser's contract: it demands a
//! single JSON object in an exact schema (or a `rejection`), which is why
//! the parser can stay shallow about nested field types.

/// Build the metaphor prompt for one user situation.
pub fn metaphor_prompt(user_input: &str) -> String {
    format!(
        r#"SYSTEM / DEVELOPER INTENT:
You are a meaning -> mechanism -> proof engine.

You MUST respond with JSON ONLY.
No markdown. No commentary. No extra keys. No leading/trailing text.

TASK:
Produce:

one sharp sentence bound to an object's physical rule

one concrete visual description that proves it
If this cannot be done cleanly, return only:
{{ "rejection": "reason" }}

INPUT: "{user_input}"

STEP 0 - INPUT CHECK
If already a conclusion/quote/moral:
-> {{ "rejection": "This is already a resolved idea." }}

STEP 1 - MEANING (LITERAL ONLY)
Extract:

Subject: who/what

Pressure: what acts on them

Conflict: what's stuck

Cost: what's lost

Emotion: ONE word
No metaphors. No wisdom.
If vague -> {{ "rejection": "Too vague to visualize." }}

STEP 2 - OBJECT (STRICT)
Choose ONE concrete real-world object.
Rules:

Instantly recognizable

Has physical function

Understandable by a child

Works on black background

ONE object only - no secondary objects that "explain"

The object's failure must be visible WITHOUT adding other elements
BANNED: abstract shapes, diagrams, UI elements, systems, secondary explanatory objects

STEP 3 - MECHANIC (NON-NEGOTIABLE)
Write the object's behavior as a rule:
"When X happens, Y inevitably happens."
Map:

X -> user's situation

Y -> the cost/outcome
If outcome isn't inevitable -> reject.
If it only "symbolizes" -> reject.

STEP 4 - QUOTE (OBJECT-BOUND)
Write 3 options. Pick best. Rules:

Describes object's behavior

Cold, factual, observational

No advice, no philosophy

If quote works without the object -> invalid

STEP 5 - VISUAL DESCRIPTION
VISUAL STYLE (NON-NEGOTIABLE):

Flat 2D illustration

Black + white only

No textures, no realism

No lighting effects, no depth

Poster/symbol style (Bauhaus, Swiss design)

Must look printable

MINIMAL RULE (CRITICAL):

ONE object only

ONE failure mode visible

ONE consequence shown

NO secondary objects that explain the meaning

If you need a second object -> you picked the wrong metaphor

Describe as GRAPHIC CONSTRUCTION:

Object + its state

What shows the failure (without extra objects)

"White shapes on black background. No texture. No extra objects."

Return JSON in this exact schema:

{{
"step1": {{
"subject": "",
"pressure": "",
"conflict": "",
"cost": "",
"emotion": ""
}},
"step2_object": "",
"step3_mechanic": {{
"rule": "",
"x_maps_to": "",
"y_maps_to": ""
}},
"step4_quotes": ["", "", ""],
"step4_best": {{
"line1": "",
"line2": ""
}},
"step5_visual": "",
"step5_dalle_prompt": "[single object + failure state]. Flat 2D vector. Pure black background. White shapes only. No gradients. No texture. No shadows. No extra objects. No ground. Minimal. Bauhaus poster style. Centered."
}}

OR: {{ "rejection": "reason" }}"#
    )
}
